use serde::{
    Deserialize,
    Serialize
};

pub type Vector2F = Vector2X<f32>;

#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Vector2X<T> {
    pub x: T,
    pub y: T,
}

pub type Rect2F = Rect2X<f32>;

#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rect2X<T> {
    pub pos: Vector2X<T>,
    pub size: Vector2X<T>,
}

impl<T: std::fmt::Display> std::fmt::Display for Vector2X<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Rect2X<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[({},{}), ({},{})]", self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

impl<T> Vector2X<T>
where
    T: Default
{
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: T::default(), y: T::default() }
    }
}

impl Vector2X<f32> {
    pub fn length_squared(&self) -> f32 {
        self.x.powi(2) + self.y.powi(2)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector, or zero for a zero-length vector.
    pub fn normal(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::zero();
        }
        Self {
            x: self.x / len,
            y: self.y / len,
        }
    }

    pub fn dot(&self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Rotates around the origin, angle in degrees, clockwise on a y-down screen.
    pub fn rotated(&self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

impl<T> std::ops::Add for Vector2X<T>
where
    T: std::ops::Add<Output = T>
{
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y
        }
    }
}

impl<T> std::ops::AddAssign for Vector2X<T>
where
    T: std::ops::AddAssign
{
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl<T> std::ops::Neg for Vector2X<T>
where
    T: std::ops::Neg<Output = T>
{
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            x: T::neg(self.x),
            y: T::neg(self.y),
        }
    }
}

impl<T> std::ops::Mul<T> for Vector2X<T>
where
    T: std::ops::Mul<Output = T> + Copy
{
    type Output = Self;
    fn mul(self, rhs: T) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs
        }
    }
}

impl<T> std::ops::Sub for Vector2X<T>
where
    T: std::ops::Sub<Output = T>
{
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: T::sub(self.x, rhs.x),
            y: T::sub(self.y, rhs.y)
        }
    }
}

impl<T> Rect2X<T> {
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self { pos: Vector2X { x, y }, size: Vector2X { x: w, y: h } }
    }
}

impl<T> Rect2X<T>
where
    T: PartialOrd + std::ops::Add<Output = T> + Copy
{
    pub fn left(&self) -> T {
        self.pos.x
    }

    pub fn top(&self) -> T {
        self.pos.y
    }

    pub fn right(&self) -> T {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> T {
        self.pos.y + self.size.y
    }

    pub fn contains(&self, point: &Vector2X<T>) -> bool {
        point.x >= self.pos.x
            && point.y >= self.pos.y
            && point.x < self.right()
            && point.y < self.bottom()
    }

    /// Open-interval overlap: rectangles sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.right() > other.left()
            && self.left() < other.right()
            && self.bottom() > other.top()
            && self.top() < other.bottom()
    }
}

#[test]
fn test_vector_creation() {
    let v1 = Vector2X::<f32>::new(1.0, 2.0);
    assert_eq!(v1.x, 1.0);
    assert_eq!(v1.y, 2.0);
}

#[test]
fn test_vector_add_assign() {
    let v1 = Vector2X::<u32>::new(1, 2);
    let mut v2 = Vector2X::<u32>::new(10, 20);
    v2 += v1;
    assert_eq!(v2.x, 11);
    assert_eq!(v2.y, 22);
}

#[test]
fn test_vector_negation_and_sub() {
    let v1 = Vector2X::<i32>::new(1, 2);
    let v2 = Vector2X::<i32>::new(4, 8);
    assert_eq!(-v1, Vector2X::new(-1, -2));
    assert_eq!(v2 - v1, Vector2X::new(3, 6));
}

#[test]
fn test_vector_normal_of_zero_is_zero() {
    assert_eq!(Vector2F::zero().normal(), Vector2F::zero());
    let n = Vector2F::new(3.0, 4.0).normal();
    assert!((n.length() - 1.0).abs() < 1e-6);
}

#[test]
fn test_vector_rotation_quarter_turn() {
    let v = Vector2F::new(1.0, 0.0).rotated(90.0);
    assert!(v.x.abs() < 1e-6, "v={v}");
    assert!((v.y - 1.0).abs() < 1e-6, "v={v}");
}

#[test]
fn test_rect_edges() {
    let rect = Rect2F::new(1.0, 2.0, 3.0, 5.0);
    assert_eq!(rect.left(), 1.0);
    assert_eq!(rect.top(), 2.0);
    assert_eq!(rect.right(), 4.0);
    assert_eq!(rect.bottom(), 7.0);
}

#[test]
fn test_rect_containing() {
    let position = Vector2X::<f32>::new(1.0, 0.0);
    let size = Vector2X::<f32>::new(3.0, 5.0);
    let rect = Rect2X::new(position.x, position.y, size.x, size.y);

    assert!(rect.contains(&position));
    assert!(!rect.contains(&(position + Vector2X::new(size.x, 0.0))));
    assert!(!rect.contains(&(position + Vector2X::new(0.0, size.y))));
    assert!(!rect.contains(&(position + size)));
    assert!(rect.contains(&(position + Vector2X::new(size.x / 2.0, size.y / 2.0))));
}

#[test]
fn test_rect_overlap_is_strict() {
    let a = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    let touching_right = Rect2F::new(10.0, 0.0, 10.0, 10.0);
    let touching_bottom = Rect2F::new(0.0, 10.0, 10.0, 10.0);
    let overlapping = Rect2F::new(9.5, 9.5, 10.0, 10.0);

    assert!(!a.overlaps(&touching_right));
    assert!(!a.overlaps(&touching_bottom));
    assert!(a.overlaps(&overlapping));
    assert!(overlapping.overlaps(&a));
}
