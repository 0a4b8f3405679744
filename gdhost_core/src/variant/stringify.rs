// Text forms of a Variant.
//
// `stringify` is what `str()` and `print()` show. Inside containers, strings
// are quoted (`"a"`, `&"name"`, `^"path"`) so `[1, "1"]` stays readable. A
// container met again while it is still being printed shows as `[...]` or
// `{...}`.

use super::Variant;
use crate::math::format_real;
use crate::object;

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Floats keep a fractional part so they read differently from ints.
fn float_string(value: f64) -> String {
    let text = format_real(value);
    if value.is_finite() && !text.contains(['.', 'e']) {
        format!("{text}.0")
    } else {
        text
    }
}

impl Variant {
    pub fn stringify(&self) -> String {
        let mut stack = Vec::new();
        self.stringify_with(&mut stack)
    }

    /// The form used for container elements and `var_to_str`: strings quoted.
    pub fn to_code_string(&self) -> String {
        let mut stack = Vec::new();
        self.stringify_nested(&mut stack)
    }

    fn stringify_nested(&self, stack: &mut Vec<usize>) -> String {
        match self {
            Variant::String(s) => quote(&s.to_string()),
            Variant::StringName(s) => format!("&{}", quote(s.as_str())),
            Variant::NodePath(p) => format!("^{}", quote(&p.to_string())),
            other => other.stringify_with(stack),
        }
    }

    fn stringify_with(&self, stack: &mut Vec<usize>) -> String {
        match self {
            Variant::Nil => "<null>".to_owned(),
            Variant::Bool(b) => b.to_string(),
            Variant::Int(i) => i.to_string(),
            Variant::Float(f) => float_string(*f),
            Variant::String(s) => s.to_string(),
            Variant::Vector2(v) => v.to_string(),
            Variant::Vector2i(v) => v.to_string(),
            Variant::Rect2(v) => v.to_string(),
            Variant::Rect2i(v) => v.to_string(),
            Variant::Vector3(v) => v.to_string(),
            Variant::Vector3i(v) => v.to_string(),
            Variant::Transform2D(v) => v.to_string(),
            Variant::Vector4(v) => v.to_string(),
            Variant::Vector4i(v) => v.to_string(),
            Variant::Plane(v) => v.to_string(),
            Variant::Quaternion(v) => v.to_string(),
            Variant::Aabb(v) => v.to_string(),
            Variant::Basis(v) => v.to_string(),
            Variant::Transform3D(v) => v.to_string(),
            Variant::Projection(v) => v.to_string(),
            Variant::Color(v) => v.to_string(),
            Variant::StringName(s) => s.as_str().to_owned(),
            Variant::NodePath(p) => p.to_string(),
            Variant::Rid(r) => r.to_string(),
            Variant::Object(o) => match object::get(o.id) {
                Some(obj) => obj.to_display_string(),
                None if o.id.is_null() => "<null>".to_owned(),
                None => "<Freed Object>".to_owned(),
            },
            Variant::Callable(c) => c.to_string(),
            Variant::Signal(s) => s.to_string(),
            Variant::Array(a) => {
                let id = a.id();
                if stack.contains(&id) {
                    return "[...]".to_owned();
                }
                stack.push(id);
                let parts: Vec<String> = a
                    .to_vec()
                    .iter()
                    .map(|v| v.stringify_nested(stack))
                    .collect();
                stack.pop();
                format!("[{}]", parts.join(", "))
            }
            Variant::Dictionary(d) => {
                let id = d.id();
                if stack.contains(&id) {
                    return "{...}".to_owned();
                }
                if d.is_empty() {
                    return "{ }".to_owned();
                }
                stack.push(id);
                let parts: Vec<String> = d
                    .entries()
                    .iter()
                    .map(|(k, v)| {
                        format!("{}: {}", k.stringify_nested(stack), v.stringify_nested(stack))
                    })
                    .collect();
                stack.pop();
                format!("{{ {} }}", parts.join(", "))
            }
            Variant::PackedByteArray(a) => a.to_string(),
            Variant::PackedInt32Array(a) => a.to_string(),
            Variant::PackedInt64Array(a) => a.to_string(),
            Variant::PackedFloat32Array(a) => a.to_string(),
            Variant::PackedFloat64Array(a) => a.to_string(),
            Variant::PackedStringArray(a) => {
                let parts: Vec<String> = a.iter().map(|s| quote(&s.to_string())).collect();
                format!("[{}]", parts.join(", "))
            }
            Variant::PackedVector2Array(a) => a.to_string(),
            Variant::PackedVector3Array(a) => a.to_string(),
            Variant::PackedColorArray(a) => a.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::array::Array;
    use crate::dictionary::Dictionary;
    use crate::math::Vector2;
    use crate::string::StringName;
    use crate::variant::Variant;

    #[test]
    fn scalars() {
        assert_eq!(Variant::Nil.stringify(), "<null>");
        assert_eq!(Variant::from(true).stringify(), "true");
        assert_eq!(Variant::from(-3).stringify(), "-3");
        assert_eq!(Variant::from(1.0).stringify(), "1.0");
        assert_eq!(Variant::from(0.5).stringify(), "0.5");
        assert_eq!(Variant::from("hi").stringify(), "hi");
        assert_eq!(Variant::from(Vector2::new(1.0, 2.5)).stringify(), "(1, 2.5)");
    }

    #[test]
    fn containers_quote_strings() {
        let a: Array = vec![
            Variant::from(1),
            Variant::from("1"),
            Variant::StringName(StringName::new("n")),
        ]
        .into();
        assert_eq!(Variant::Array(a).stringify(), r#"[1, "1", &"n"]"#);

        let d = Dictionary::new();
        assert_eq!(Variant::Dictionary(d.clone()).stringify(), "{ }");
        d.set(Variant::from("k"), Variant::from(2));
        assert_eq!(Variant::Dictionary(d).stringify(), r#"{ "k": 2 }"#);
    }

    #[test]
    fn cycles_are_elided() {
        let a = Array::new();
        a.push_back(Variant::from(1)).unwrap();
        a.push_back(Variant::Array(a.clone())).unwrap();
        assert_eq!(Variant::Array(a.clone()).stringify(), "[1, [...]]");
        a.clear().unwrap();
    }
}
