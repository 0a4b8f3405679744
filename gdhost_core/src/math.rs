// Math value types carried inline (or boxed) by `Variant`.
//
// All types are `#[repr(C)]` because their in-memory layout is also their
// ptrcall representation: an extension passing a `Vector3` through a typed
// pointer hands us three packed `f32`s. Components are single precision
// (`Real = f32`), integer vectors are `i32`.
//
// Only the operations the operator table and the builtin method table need
// are implemented; this is not a general linear-algebra library.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

pub type Real = f32;

pub const CMP_EPSILON: Real = 0.00001;

pub fn is_equal_approx(a: Real, b: Real) -> bool {
    if a == b {
        return true;
    }
    let tolerance = (CMP_EPSILON * a.abs()).max(CMP_EPSILON);
    (a - b).abs() < tolerance
}

/// Format a float the way the engine prints numbers: integral values without
/// a fractional part, everything else with the shortest round-trip form.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

macro_rules! vector_type {
    ($name:ident, $scalar:ty, $($field:ident),+) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
        pub struct $name {
            $(pub $field: $scalar),+
        }

        impl $name {
            pub const fn new($($field: $scalar),+) -> Self {
                Self { $($field),+ }
            }

            pub const fn splat(v: $scalar) -> Self {
                Self { $($field: v),+ }
            }

            pub fn components(&self) -> Vec<$scalar> {
                vec![$(self.$field),+]
            }

            pub fn dot(self, other: Self) -> $scalar {
                let mut sum = <$scalar>::default();
                $(sum = Arith::add(sum, Arith::mul(self.$field, other.$field));)+
                sum
            }

            pub fn abs(self) -> Self {
                Self { $($field: self.$field.abs()),+ }
            }

            pub fn min(self, other: Self) -> Self {
                Self { $($field: if other.$field < self.$field { other.$field } else { self.$field }),+ }
            }

            pub fn max(self, other: Self) -> Self {
                Self { $($field: if other.$field > self.$field { other.$field } else { self.$field }),+ }
            }

            pub fn get(&self, index: usize) -> Option<$scalar> {
                [$(self.$field),+].get(index).copied()
            }

            pub fn set(&mut self, index: usize, value: $scalar) -> bool {
                let mut slots = [$(&mut self.$field),+];
                match slots.get_mut(index) {
                    Some(slot) => {
                        **slot = value;
                        true
                    }
                    None => false,
                }
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, o: Self) -> Self {
                Self { $($field: Arith::add(self.$field, o.$field)),+ }
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, o: Self) -> Self {
                Self { $($field: Arith::sub(self.$field, o.$field)),+ }
            }
        }

        impl Mul for $name {
            type Output = Self;
            fn mul(self, o: Self) -> Self {
                Self { $($field: Arith::mul(self.$field, o.$field)),+ }
            }
        }

        impl Mul<$scalar> for $name {
            type Output = Self;
            fn mul(self, s: $scalar) -> Self {
                Self { $($field: Arith::mul(self.$field, s)),+ }
            }
        }

        impl Div for $name {
            type Output = Self;
            fn div(self, o: Self) -> Self {
                Self { $($field: Arith::div(self.$field, o.$field)),+ }
            }
        }

        impl Div<$scalar> for $name {
            type Output = Self;
            fn div(self, s: $scalar) -> Self {
                Self { $($field: Arith::div(self.$field, s)),+ }
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self { $($field: Arith::neg(self.$field)),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let parts: Vec<String> = vec![$(component_string(self.$field)),+];
                write!(f, "({})", parts.join(", "))
            }
        }
    };
}

/// Component arithmetic. Integer components wrap and divide by zero to zero
/// instead of panicking.
trait Arith: Copy {
    fn add(a: Self, b: Self) -> Self;
    fn sub(a: Self, b: Self) -> Self;
    fn mul(a: Self, b: Self) -> Self;
    fn div(a: Self, b: Self) -> Self;
    fn neg(a: Self) -> Self;
}

impl Arith for f32 {
    fn add(a: Self, b: Self) -> Self {
        a + b
    }
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }
    fn mul(a: Self, b: Self) -> Self {
        a * b
    }
    fn div(a: Self, b: Self) -> Self {
        a / b
    }
    fn neg(a: Self) -> Self {
        -a
    }
}

impl Arith for i32 {
    fn add(a: Self, b: Self) -> Self {
        a.wrapping_add(b)
    }
    fn sub(a: Self, b: Self) -> Self {
        a.wrapping_sub(b)
    }
    fn mul(a: Self, b: Self) -> Self {
        a.wrapping_mul(b)
    }
    fn div(a: Self, b: Self) -> Self {
        a.checked_div(b).unwrap_or(0)
    }
    fn neg(a: Self) -> Self {
        a.wrapping_neg()
    }
}

trait ComponentString {
    fn component_string(self) -> String;
}

impl ComponentString for f32 {
    fn component_string(self) -> String {
        format_real(f64::from(self))
    }
}

impl ComponentString for i32 {
    fn component_string(self) -> String {
        self.to_string()
    }
}

fn component_string<T: ComponentString>(v: T) -> String {
    v.component_string()
}

macro_rules! real_vector_methods {
    ($name:ident, $($field:ident),+) => {
        impl $name {
            pub fn length_squared(self) -> Real {
                self.dot(self)
            }

            pub fn length(self) -> Real {
                self.length_squared().sqrt()
            }

            pub fn normalized(self) -> Self {
                let len = self.length();
                if len == 0.0 { Self::default() } else { self / len }
            }

            pub fn is_normalized(self) -> bool {
                is_equal_approx(self.length_squared(), 1.0)
            }

            pub fn distance_to(self, other: Self) -> Real {
                (other - self).length()
            }

            pub fn lerp(self, to: Self, weight: Real) -> Self {
                Self { $($field: self.$field + (to.$field - self.$field) * weight),+ }
            }

            pub fn floor(self) -> Self {
                Self { $($field: self.$field.floor()),+ }
            }

            pub fn ceil(self) -> Self {
                Self { $($field: self.$field.ceil()),+ }
            }

            pub fn round(self) -> Self {
                Self { $($field: self.$field.round()),+ }
            }

            pub fn is_equal_approx(self, other: Self) -> bool {
                true $(&& is_equal_approx(self.$field, other.$field))+
            }

            pub fn is_finite(self) -> bool {
                true $(&& self.$field.is_finite())+
            }
        }
    };
}

macro_rules! int_vector_methods {
    ($name:ident, $real:ident, $($field:ident),+) => {
        impl $name {
            pub fn length_squared(self) -> i64 {
                0 $(+ i64::from(self.$field) * i64::from(self.$field))+
            }

            pub fn length(self) -> f64 {
                (self.length_squared() as f64).sqrt()
            }

            pub fn to_real(self) -> $real {
                $real { $($field: self.$field as Real),+ }
            }

            pub fn from_real(v: $real) -> Self {
                #[allow(clippy::cast_possible_truncation)]
                let out = Self { $($field: v.$field as i32),+ };
                out
            }
        }

        impl Rem for $name {
            type Output = Self;
            fn rem(self, o: Self) -> Self {
                Self { $($field: self.$field.checked_rem(o.$field).unwrap_or(0)),+ }
            }
        }

        impl Rem<i32> for $name {
            type Output = Self;
            fn rem(self, s: i32) -> Self {
                Self { $($field: self.$field.checked_rem(s).unwrap_or(0)),+ }
            }
        }
    };
}

vector_type!(Vector2, Real, x, y);
vector_type!(Vector2i, i32, x, y);
vector_type!(Vector3, Real, x, y, z);
vector_type!(Vector3i, i32, x, y, z);
vector_type!(Vector4, Real, x, y, z, w);
vector_type!(Vector4i, i32, x, y, z, w);

real_vector_methods!(Vector2, x, y);
real_vector_methods!(Vector3, x, y, z);
real_vector_methods!(Vector4, x, y, z, w);
int_vector_methods!(Vector2i, Vector2, x, y);
int_vector_methods!(Vector3i, Vector3, x, y, z);
int_vector_methods!(Vector4i, Vector4, x, y, z, w);

impl Vector2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0);
    pub const LEFT: Self = Self::new(-1.0, 0.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0);
    pub const UP: Self = Self::new(0.0, -1.0);
    pub const DOWN: Self = Self::new(0.0, 1.0);

    pub fn cross(self, other: Self) -> Real {
        self.x * other.y - self.y * other.x
    }

    pub fn angle(self) -> Real {
        self.y.atan2(self.x)
    }

    pub fn aspect(self) -> Real {
        self.x / self.y
    }
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    pub const LEFT: Self = Self::new(-1.0, 0.0, 0.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    pub const DOWN: Self = Self::new(0.0, -1.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, -1.0);
    pub const BACK: Self = Self::new(0.0, 0.0, 1.0);

    pub fn cross(self, o: Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }
}

impl Vector2i {
    pub const ZERO: Self = Self::new(0, 0);
    pub const ONE: Self = Self::new(1, 1);
}

impl Vector3i {
    pub const ZERO: Self = Self::new(0, 0, 0);
    pub const ONE: Self = Self::new(1, 1, 1);
}

impl Vector4 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
}

impl Vector4i {
    pub const ZERO: Self = Self::new(0, 0, 0, 0);
    pub const ONE: Self = Self::new(1, 1, 1, 1);
}

// ---------------------------------------------------------------------------
// Rects and boxes
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

impl Rect2 {
    pub const fn new(position: Vector2, size: Vector2) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector2 {
        self.position + self.size
    }

    pub fn set_end(&mut self, end: Vector2) {
        self.size = end - self.position;
    }

    pub fn area(&self) -> Real {
        self.size.x * self.size.y
    }

    pub fn center(&self) -> Vector2 {
        self.position + self.size * 0.5
    }

    pub fn has_point(&self, p: Vector2) -> bool {
        let end = self.end();
        p.x >= self.position.x && p.y >= self.position.y && p.x < end.x && p.y < end.y
    }

    pub fn intersects(&self, other: &Rect2) -> bool {
        let (a_end, b_end) = (self.end(), other.end());
        self.position.x < b_end.x
            && a_end.x > other.position.x
            && self.position.y < b_end.y
            && a_end.y > other.position.y
    }

    pub fn is_equal_approx(&self, other: &Rect2) -> bool {
        self.position.is_equal_approx(other.position) && self.size.is_equal_approx(other.size)
    }
}

impl fmt::Display for Rect2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[P: {}, S: {}]", self.position, self.size)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect2i {
    pub position: Vector2i,
    pub size: Vector2i,
}

impl Rect2i {
    pub const fn new(position: Vector2i, size: Vector2i) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector2i {
        self.position + self.size
    }

    pub fn set_end(&mut self, end: Vector2i) {
        self.size = end - self.position;
    }

    pub fn area(&self) -> i64 {
        i64::from(self.size.x) * i64::from(self.size.y)
    }

    pub fn has_point(&self, p: Vector2i) -> bool {
        let end = self.end();
        p.x >= self.position.x && p.y >= self.position.y && p.x < end.x && p.y < end.y
    }
}

impl fmt::Display for Rect2i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[P: {}, S: {}]", self.position, self.size)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

impl Aabb {
    pub const fn new(position: Vector3, size: Vector3) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector3 {
        self.position + self.size
    }

    pub fn set_end(&mut self, end: Vector3) {
        self.size = end - self.position;
    }

    pub fn volume(&self) -> Real {
        self.size.x * self.size.y * self.size.z
    }

    pub fn center(&self) -> Vector3 {
        self.position + self.size * 0.5
    }

    pub fn has_point(&self, p: Vector3) -> bool {
        let end = self.end();
        p.x >= self.position.x
            && p.y >= self.position.y
            && p.z >= self.position.z
            && p.x <= end.x
            && p.y <= end.y
            && p.z <= end.z
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[P: {}, S: {}]", self.position, self.size)
    }
}

// ---------------------------------------------------------------------------
// Plane, Quaternion
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: Real,
}

impl Plane {
    pub const fn new(normal: Vector3, d: Real) -> Self {
        Self { normal, d }
    }

    pub fn distance_to(&self, point: Vector3) -> Real {
        self.normal.dot(point) - self.d
    }

    pub fn is_point_over(&self, point: Vector3) -> bool {
        self.normal.dot(point) > self.d
    }

    pub fn normalized(&self) -> Plane {
        let len = self.normal.length();
        if len == 0.0 {
            return Plane::default();
        }
        Plane::new(self.normal / len, self.d / len)
    }
}

impl Neg for Plane {
    type Output = Plane;
    fn neg(self) -> Plane {
        Plane::new(-self.normal, -self.d)
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[N: {}, D: {}]", self.normal, format_real(f64::from(self.d)))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: Real,
    pub y: Real,
    pub z: Real,
    pub w: Real,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: Real, y: Real, z: Real, w: Real) -> Self {
        Self { x, y, z, w }
    }

    pub fn dot(self, o: Self) -> Real {
        self.x * o.x + self.y * o.y + self.z * o.z + self.w * o.w
    }

    pub fn length(self) -> Real {
        self.dot(self).sqrt()
    }

    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 { self } else { self * (1.0 / len) }
    }

    pub fn inverse(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn xform(self, v: Vector3) -> Vector3 {
        let u = Vector3::new(self.x, self.y, self.z);
        let uv = u.cross(v);
        v + ((uv * self.w) + u.cross(uv)) * 2.0
    }

    pub fn get(&self, index: usize) -> Option<Real> {
        [self.x, self.y, self.z, self.w].get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: Real) -> bool {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            3 => self.w = value,
            _ => return false,
        }
        true
    }
}

impl Add for Quaternion {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z, self.w + o.w)
    }
}

impl Sub for Quaternion {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z, self.w - o.w)
    }
}

impl Mul for Quaternion {
    type Output = Self;
    fn mul(self, q: Self) -> Self {
        Self::new(
            self.w * q.x + self.x * q.w + self.y * q.z - self.z * q.y,
            self.w * q.y + self.y * q.w + self.z * q.x - self.x * q.z,
            self.w * q.z + self.z * q.w + self.x * q.y - self.y * q.x,
            self.w * q.w - self.x * q.x - self.y * q.y - self.z * q.z,
        )
    }
}

impl Mul<Real> for Quaternion {
    type Output = Self;
    fn mul(self, s: Real) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }
}

impl Div<Real> for Quaternion {
    type Output = Self;
    fn div(self, s: Real) -> Self {
        self * (1.0 / s)
    }
}

impl Neg for Quaternion {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            format_real(f64::from(self.x)),
            format_real(f64::from(self.y)),
            format_real(f64::from(self.z)),
            format_real(f64::from(self.w))
        )
    }
}

// ---------------------------------------------------------------------------
// Matrices
// ---------------------------------------------------------------------------

/// 2D affine transform stored as three column vectors (x axis, y axis,
/// origin).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub columns: [Vector2; 3],
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        columns: [Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0), Vector2::ZERO],
    };

    pub const fn new(x: Vector2, y: Vector2, origin: Vector2) -> Self {
        Self { columns: [x, y, origin] }
    }

    pub fn from_rotation(angle: Real, origin: Vector2) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(Vector2::new(c, s), Vector2::new(-s, c), origin)
    }

    pub fn basis_xform(&self, v: Vector2) -> Vector2 {
        self.columns[0] * v.x + self.columns[1] * v.y
    }

    pub fn xform(&self, v: Vector2) -> Vector2 {
        self.basis_xform(v) + self.columns[2]
    }

    pub fn determinant(&self) -> Real {
        self.columns[0].x * self.columns[1].y - self.columns[0].y * self.columns[1].x
    }

    pub fn affine_inverse(&self) -> Self {
        let det = self.determinant();
        if det == 0.0 {
            return Self::IDENTITY;
        }
        let idet = 1.0 / det;
        let x = Vector2::new(self.columns[1].y, -self.columns[0].y) * idet;
        let y = Vector2::new(-self.columns[1].x, self.columns[0].x) * idet;
        let mut out = Self::new(x, y, Vector2::ZERO);
        out.columns[2] = -out.basis_xform(self.columns[2]);
        out
    }
}

impl Mul for Transform2D {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        Self::new(
            self.basis_xform(o.columns[0]),
            self.basis_xform(o.columns[1]),
            self.xform(o.columns[2]),
        )
    }
}

impl fmt::Display for Transform2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[X: {}, Y: {}, O: {}]", self.columns[0], self.columns[1], self.columns[2])
    }
}

/// 3x3 matrix stored as rows.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Basis {
    pub const IDENTITY: Self = Self {
        rows: [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ],
    };

    pub fn from_columns(x: Vector3, y: Vector3, z: Vector3) -> Self {
        Self {
            rows: [
                Vector3::new(x.x, y.x, z.x),
                Vector3::new(x.y, y.y, z.y),
                Vector3::new(x.z, y.z, z.z),
            ],
        }
    }

    pub fn column(&self, i: usize) -> Vector3 {
        let c = |r: &Vector3| r.get(i).unwrap_or(0.0);
        Vector3::new(c(&self.rows[0]), c(&self.rows[1]), c(&self.rows[2]))
    }

    pub fn set_column(&mut self, i: usize, v: Vector3) {
        self.rows[0].set(i, v.x);
        self.rows[1].set(i, v.y);
        self.rows[2].set(i, v.z);
    }

    pub fn xform(&self, v: Vector3) -> Vector3 {
        Vector3::new(self.rows[0].dot(v), self.rows[1].dot(v), self.rows[2].dot(v))
    }

    pub fn transposed(&self) -> Self {
        Self {
            rows: [self.column(0), self.column(1), self.column(2)],
        }
    }

    pub fn determinant(&self) -> Real {
        let r = &self.rows;
        r[0].x * (r[1].y * r[2].z - r[2].y * r[1].z) - r[1].x * (r[0].y * r[2].z - r[2].y * r[0].z)
            + r[2].x * (r[0].y * r[1].z - r[1].y * r[0].z)
    }

    pub fn scaled(&self, scale: Vector3) -> Self {
        Self {
            rows: [self.rows[0] * scale.x, self.rows[1] * scale.y, self.rows[2] * scale.z],
        }
    }
}

impl Mul for Basis {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        let t = o.transposed();
        Self {
            rows: [
                Vector3::new(t.rows[0].dot(self.rows[0]), t.rows[1].dot(self.rows[0]), t.rows[2].dot(self.rows[0])),
                Vector3::new(t.rows[0].dot(self.rows[1]), t.rows[1].dot(self.rows[1]), t.rows[2].dot(self.rows[1])),
                Vector3::new(t.rows[0].dot(self.rows[2]), t.rows[1].dot(self.rows[2]), t.rows[2].dot(self.rows[2])),
            ],
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[X: {}, Y: {}, Z: {}]", self.column(0), self.column(1), self.column(2))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

impl Transform3D {
    pub const IDENTITY: Self = Self {
        basis: Basis::IDENTITY,
        origin: Vector3::ZERO,
    };

    pub const fn new(basis: Basis, origin: Vector3) -> Self {
        Self { basis, origin }
    }

    pub fn xform(&self, v: Vector3) -> Vector3 {
        self.basis.xform(v) + self.origin
    }

    pub fn translated(&self, offset: Vector3) -> Self {
        Self::new(self.basis, self.origin + offset)
    }
}

impl Mul for Transform3D {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        Self::new(self.basis * o.basis, self.xform(o.origin))
    }
}

impl fmt::Display for Transform3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[X: {}, Y: {}, Z: {}, O: {}]",
            self.basis.column(0),
            self.basis.column(1),
            self.basis.column(2),
            self.origin
        )
    }
}

/// 4x4 matrix stored as columns.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub columns: [Vector4; 4],
}

impl Default for Projection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Projection {
    pub const IDENTITY: Self = Self {
        columns: [
            Vector4::new(1.0, 0.0, 0.0, 0.0),
            Vector4::new(0.0, 1.0, 0.0, 0.0),
            Vector4::new(0.0, 0.0, 1.0, 0.0),
            Vector4::new(0.0, 0.0, 0.0, 1.0),
        ],
    };

    pub fn xform(&self, v: Vector4) -> Vector4 {
        self.columns[0] * v.x + self.columns[1] * v.y + self.columns[2] * v.z + self.columns[3] * v.w
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.columns;
        for row in 0..4 {
            let cell = |col: &Vector4| format_real(f64::from(col.get(row).unwrap_or(0.0)));
            writeln!(f, "{}, {}, {}, {}", cell(&c[0]), cell(&c[1]), cell(&c[2]), cell(&c[3]))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(1.0, 1.0, 1.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn inverted(&self) -> Self {
        Self::new(1.0 - self.r, 1.0 - self.g, 1.0 - self.b, self.a)
    }

    pub fn lerp(&self, to: Color, weight: f32) -> Self {
        Self::new(
            self.r + (to.r - self.r) * weight,
            self.g + (to.g - self.g) * weight,
            self.b + (to.b - self.b) * weight,
            self.a + (to.a - self.a) * weight,
        )
    }

    /// Channel as an 8-bit integer, rounded and clamped.
    pub fn channel8(value: f32) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let v = (value * 255.0).round() as i64;
        v.clamp(0, 255)
    }

    pub fn to_html(&self, with_alpha: bool) -> String {
        let mut out = format!(
            "{:02x}{:02x}{:02x}",
            Self::channel8(self.r),
            Self::channel8(self.g),
            Self::channel8(self.b)
        );
        if with_alpha {
            out.push_str(&format!("{:02x}", Self::channel8(self.a)));
        }
        out
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        [self.r, self.g, self.b, self.a].get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: f32) -> bool {
        match index {
            0 => self.r = value,
            1 => self.g = value,
            2 => self.b = value,
            3 => self.a = value,
            _ => return false,
        }
        true
    }
}

impl Add for Color {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.r + o.r, self.g + o.g, self.b + o.b, self.a + o.a)
    }
}

impl Sub for Color {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.r - o.r, self.g - o.g, self.b - o.b, self.a - o.a)
    }
}

impl Mul for Color {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        Self::new(self.r * o.r, self.g * o.g, self.b * o.b, self.a * o.a)
    }
}

impl Mul<f32> for Color {
    type Output = Self;
    fn mul(self, s: f32) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

impl Div for Color {
    type Output = Self;
    fn div(self, o: Self) -> Self {
        Self::new(self.r / o.r, self.g / o.g, self.b / o.b, self.a / o.a)
    }
}

impl Div<f32> for Color {
    type Output = Self;
    fn div(self, s: f32) -> Self {
        Self::new(self.r / s, self.g / s, self.b / s, self.a / s)
    }
}

impl Neg for Color {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(1.0 - self.r, 1.0 - self.g, 1.0 - self.b, 1.0 - self.a)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            format_real(f64::from(self.r)),
            format_real(f64::from(self.g)),
            format_real(f64::from(self.b)),
            format_real(f64::from(self.a))
        )
    }
}

// ---------------------------------------------------------------------------
// Cross-type conversions used by `Variant::convert`
// ---------------------------------------------------------------------------

impl Basis {
    pub fn from_quaternion(q: Quaternion) -> Self {
        let d = q.dot(q);
        let s = if d == 0.0 { 0.0 } else { 2.0 / d };
        let (xs, ys, zs) = (q.x * s, q.y * s, q.z * s);
        let (wx, wy, wz) = (q.w * xs, q.w * ys, q.w * zs);
        let (xx, xy, xz) = (q.x * xs, q.x * ys, q.x * zs);
        let (yy, yz, zz) = (q.y * ys, q.y * zs, q.z * zs);
        Self {
            rows: [
                Vector3::new(1.0 - (yy + zz), xy - wz, xz + wy),
                Vector3::new(xy + wz, 1.0 - (xx + zz), yz - wx),
                Vector3::new(xz - wy, yz + wx, 1.0 - (xx + yy)),
            ],
        }
    }
}

impl Quaternion {
    /// Rotation part of an orthonormal basis.
    pub fn from_basis(b: &Basis) -> Self {
        let m = &b.rows;
        let trace = m[0].x + m[1].y + m[2].z;
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                (m[2].y - m[1].z) / s,
                (m[0].z - m[2].x) / s,
                (m[1].x - m[0].y) / s,
                0.25 * s,
            )
        } else if m[0].x > m[1].y && m[0].x > m[2].z {
            let s = (1.0 + m[0].x - m[1].y - m[2].z).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m[0].y + m[1].x) / s,
                (m[0].z + m[2].x) / s,
                (m[2].y - m[1].z) / s,
            )
        } else if m[1].y > m[2].z {
            let s = (1.0 + m[1].y - m[0].x - m[2].z).sqrt() * 2.0;
            Self::new(
                (m[0].y + m[1].x) / s,
                0.25 * s,
                (m[1].z + m[2].y) / s,
                (m[0].z - m[2].x) / s,
            )
        } else {
            let s = (1.0 + m[2].z - m[0].x - m[1].y).sqrt() * 2.0;
            Self::new(
                (m[0].z + m[2].x) / s,
                (m[1].z + m[2].y) / s,
                0.25 * s,
                (m[1].x - m[0].y) / s,
            )
        }
    }
}

impl Transform2D {
    /// The XY part of a 3D transform.
    pub fn from_transform3d(t: &Transform3D) -> Self {
        let x = t.basis.column(0);
        let y = t.basis.column(1);
        Self::new(
            Vector2::new(x.x, x.y),
            Vector2::new(y.x, y.y),
            Vector2::new(t.origin.x, t.origin.y),
        )
    }
}

impl Transform3D {
    pub fn from_transform2d(t: &Transform2D) -> Self {
        let [x, y, o] = t.columns;
        Self::new(
            Basis::from_columns(
                Vector3::new(x.x, x.y, 0.0),
                Vector3::new(y.x, y.y, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ),
            Vector3::new(o.x, o.y, 0.0),
        )
    }

    pub fn from_projection(p: &Projection) -> Self {
        let c = &p.columns;
        Self::new(
            Basis::from_columns(
                Vector3::new(c[0].x, c[0].y, c[0].z),
                Vector3::new(c[1].x, c[1].y, c[1].z),
                Vector3::new(c[2].x, c[2].y, c[2].z),
            ),
            Vector3::new(c[3].x, c[3].y, c[3].z),
        )
    }
}

impl Projection {
    pub fn from_transform3d(t: &Transform3D) -> Self {
        let col = |i: usize| {
            let v = t.basis.column(i);
            Vector4::new(v.x, v.y, v.z, 0.0)
        };
        Self {
            columns: [
                col(0),
                col(1),
                col(2),
                Vector4::new(t.origin.x, t.origin.y, t.origin.z, 1.0),
            ],
        }
    }
}

impl Color {
    /// From a packed `0xRRGGBBAA` value.
    pub fn from_rgba32(value: u32) -> Self {
        let channel = |shift: u32| f32::from(((value >> shift) & 0xff) as u8) / 255.0;
        Self::new(channel(24), channel(16), channel(8), channel(0))
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    pub fn from_html(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        let unit = |v: u8| f32::from(v) / 255.0;
        let short = |v: u8| f32::from(v) / 15.0;
        match hex.len() {
            3 => Some(Self::new(short(digit(0)?), short(digit(1)?), short(digit(2)?), 1.0)),
            4 => Some(Self::new(
                short(digit(0)?),
                short(digit(1)?),
                short(digit(2)?),
                short(digit(3)?),
            )),
            6 => Some(Self::new(unit(pair(0)?), unit(pair(2)?), unit(pair(4)?), 1.0)),
            8 => Some(Self::new(
                unit(pair(0)?),
                unit(pair(2)?),
                unit(pair(4)?),
                unit(pair(6)?),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, 4.0);
        assert_eq!(a + b, Vector2::new(4.0, 6.0));
        assert_eq!(b - a, Vector2::new(2.0, 2.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(a.dot(b), 11.0);
        assert_eq!(Vector2::new(3.0, 4.0).length(), 5.0);
        assert!(Vector2::new(3.0, 4.0).normalized().is_normalized());
    }

    #[test]
    fn int_vector_remainder_by_zero_is_safe() {
        let v = Vector2i::new(7, -7) % Vector2i::new(3, 0);
        assert_eq!(v.x, 1);
        assert_eq!(v.y, 0);
    }

    #[test]
    fn cross_product() {
        assert_eq!(Vector3::RIGHT.cross(Vector3::UP), Vector3::BACK);
    }

    #[test]
    fn transform2d_inverse_round_trip() {
        let t = Transform2D::from_rotation(0.5, Vector2::new(3.0, -2.0));
        let p = Vector2::new(1.5, 2.5);
        let back = t.affine_inverse().xform(t.xform(p));
        assert!(back.is_equal_approx(p));
    }

    #[test]
    fn basis_multiplication_by_identity() {
        let b = Basis::from_columns(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Vector3::new(7.0, 8.0, 10.0),
        );
        assert_eq!(b * Basis::IDENTITY, b);
        assert_eq!(Basis::IDENTITY * b, b);
        assert_eq!(b.transposed().transposed(), b);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Vector2::new(1.0, 2.5).to_string(), "(1, 2.5)");
        assert_eq!(Vector3i::new(1, 2, 3).to_string(), "(1, 2, 3)");
        assert_eq!(
            Rect2::new(Vector2::ZERO, Vector2::ONE).to_string(),
            "[P: (0, 0), S: (1, 1)]"
        );
        assert_eq!(Color::RED.to_html(false), "ff0000");
    }

    #[test]
    fn real_formatting() {
        assert_eq!(format_real(3.0), "3");
        assert_eq!(format_real(-0.5), "-0.5");
        assert_eq!(format_real(f64::INFINITY), "inf");
    }

    #[test]
    fn html_colors() {
        assert_eq!(Color::from_html("#ff0000"), Some(Color::RED));
        assert_eq!(Color::from_html("f00"), Some(Color::RED));
        assert_eq!(Color::from_html("#00ff0080").map(|c| Color::channel8(c.a)), Some(128));
        assert_eq!(Color::from_html("#zz0000"), None);
        assert_eq!(Color::from_rgba32(0xff0000ff), Color::RED);
    }

    #[test]
    fn quaternion_basis_round_trip() {
        let q = Quaternion::new(0.0, 0.70710677, 0.0, 0.70710677);
        let back = Quaternion::from_basis(&Basis::from_quaternion(q));
        assert!((back.y - q.y).abs() < 1e-5);
        assert!((back.w - q.w).abs() < 1e-5);
        assert_eq!(Quaternion::from_basis(&Basis::IDENTITY), Quaternion::IDENTITY);
    }
}
