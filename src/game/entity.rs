use serde::{
    Deserialize,
    Serialize
};

use super::math::{
    Rect2F,
    Vector2F
};

pub type EntityId = u32;

/// Construction option bag.
///
/// Deserializes from the camelCase keys `hitboxWidth`, `hitboxHeight`,
/// `originX` and `originY`; missing keys fall back to the defaults.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityOptions {
    /// Collision rectangle width, full box width when absent.
    pub hitbox_width: Option<f32>,
    /// Collision rectangle height, full box height when absent.
    pub hitbox_height: Option<f32>,
    /// Offset of the logical `x` anchor from the left edge.
    pub origin_x: f32,
    /// Offset of the logical `y` anchor from the top edge.
    pub origin_y: f32,
}

impl EntityOptions {
    pub fn with_hitbox(mut self, width: f32, height: f32) -> Self {
        self.hitbox_width = Some(width);
        self.hitbox_height = Some(height);
        self
    }

    pub fn with_origin(mut self, origin_x: f32, origin_y: f32) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    pub fn centered(self, size: Vector2F) -> Self {
        self.with_origin(size.x / 2.0, size.y / 2.0)
    }
}

/// Hitbox edges as offsets from the entity's top-left corner.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Hitbox {
    /// Rectangle of `width` x `height` centered in a box of `size`.
    pub fn centered_in(size: Vector2F, width: f32, height: f32) -> Self {
        let left = (size.x - width) / 2.0;
        let top = (size.y - height) / 2.0;
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// What a visual node needs to mirror an entity.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub top_left: Vector2F,
    pub size: Vector2F,
    /// Degrees, clockwise.
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    top_left: Vector2F,
    size: Vector2F,
    origin: Vector2F,
    rotation: f32,
    hitbox: Hitbox,
    sprite: String,
}

impl Entity {
    pub fn new<S: AsRef<str>>(id: EntityId, position: Vector2F, size: Vector2F, sprite: S, options: EntityOptions) -> Self {
        let origin = Vector2F::new(options.origin_x, options.origin_y);
        let mut entity = Self {
            id,
            top_left: position - origin,
            size,
            origin,
            rotation: 0.0,
            hitbox: Hitbox::default(),
            sprite: sprite.as_ref().to_string(),
        };
        entity.set_hitbox(options.hitbox_width, options.hitbox_height);
        entity
    }

    pub fn x(&self) -> f32 {
        self.top_left.x + self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.top_left.y + self.origin.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.top_left.x = x - self.origin.x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.top_left.y = y - self.origin.y;
    }

    pub fn position(&self) -> Vector2F {
        Vector2F::new(self.x(), self.y())
    }

    pub fn set_position(&mut self, position: Vector2F) {
        self.top_left = position - self.origin;
    }

    pub fn translate(&mut self, delta: Vector2F) {
        self.top_left += delta;
    }

    pub fn left(&self) -> f32 {
        self.top_left.x
    }

    pub fn top(&self) -> f32 {
        self.top_left.y
    }

    pub fn right(&self) -> f32 {
        self.top_left.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.top_left.y + self.size.y
    }

    /// Moves the box so its right edge lands on `right`, size unchanged.
    pub fn set_right(&mut self, right: f32) {
        self.top_left.x = right - self.size.x;
    }

    /// Moves the box so its bottom edge lands on `bottom`, size unchanged.
    pub fn set_bottom(&mut self, bottom: f32) {
        self.top_left.y = bottom - self.size.y;
    }

    pub fn top_left(&self) -> Vector2F {
        self.top_left
    }

    pub fn origin(&self) -> Vector2F {
        self.origin
    }

    pub fn size(&self) -> Vector2F {
        self.size
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn set_width(&mut self, width: f32) {
        self.resize(Vector2F::new(width, self.size.y));
    }

    pub fn set_height(&mut self, height: f32) {
        self.resize(Vector2F::new(self.size.x, height));
    }

    /// Changes the box size and rescales the hitbox offsets by new/old per axis,
    /// so the hitbox keeps its fraction of the box. An axis whose previous size
    /// is zero (or not finite) is not rescaled.
    pub fn resize(&mut self, size: Vector2F) {
        let kx = rescale_ratio(self.size.x, size.x);
        let ky = rescale_ratio(self.size.y, size.y);
        self.size = size;
        self.rescale_hitbox(kx, ky);
    }

    /// Scales the stored hitbox offsets without touching the box size.
    pub fn rescale_hitbox(&mut self, kx: f32, ky: f32) {
        self.hitbox.left *= kx;
        self.hitbox.right *= kx;
        self.hitbox.top *= ky;
        self.hitbox.bottom *= ky;
    }

    /// Recenters a `width` x `height` hitbox in the box; `None` means full size.
    pub fn set_hitbox(&mut self, width: Option<f32>, height: Option<f32>) {
        self.hitbox = Hitbox::centered_in(
            self.size,
            width.unwrap_or(self.size.x),
            height.unwrap_or(self.size.y)
        );
    }

    /// Replaces the offsets verbatim; they may reach outside the box.
    pub fn set_hitbox_offsets(&mut self, hitbox: Hitbox) {
        self.hitbox = hitbox;
    }

    pub fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    pub fn hitbox_left(&self) -> f32 {
        self.top_left.x + self.hitbox.left
    }

    pub fn hitbox_top(&self) -> f32 {
        self.top_left.y + self.hitbox.top
    }

    pub fn hitbox_right(&self) -> f32 {
        self.top_left.x + self.hitbox.right
    }

    pub fn hitbox_bottom(&self) -> f32 {
        self.top_left.y + self.hitbox.bottom
    }

    pub fn hitbox_rect(&self) -> Rect2F {
        Rect2F::new(
            self.hitbox_left(),
            self.hitbox_top(),
            self.hitbox.width(),
            self.hitbox.height()
        )
    }

    pub fn bounds(&self) -> Rect2F {
        Rect2F { pos: self.top_left, size: self.size }
    }

    pub fn center(&self) -> Vector2F {
        self.top_left + self.size * 0.5
    }

    pub fn contains_point(&self, point: &Vector2F) -> bool {
        self.bounds().contains(point)
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    pub fn rotate_by(&mut self, degrees: f32) {
        self.rotation += degrees;
    }

    pub fn sprite(&self) -> &str {
        &self.sprite
    }

    pub(crate) fn set_sprite<S: AsRef<str>>(&mut self, sprite: S) {
        self.sprite = sprite.as_ref().to_string();
    }

    /// Hitbox overlap, strict on every edge; touching boxes do not collide.
    pub fn collided_with(&self, other: &Entity) -> bool {
        self.hitbox_rect().overlaps(&other.hitbox_rect())
    }

    pub fn transform(&self) -> NodeTransform {
        NodeTransform {
            top_left: self.top_left,
            size: self.size,
            rotation: self.rotation,
        }
    }
}

fn rescale_ratio(old: f32, new: f32) -> f32 {
    if old == 0.0 || !old.is_finite() {
        1.0
    } else {
        new / old
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn entity(x: f32, y: f32, w: f32, h: f32) -> Entity {
        Entity::new(0, Vector2F::new(x, y), Vector2F::new(w, h), "box.png", EntityOptions::default())
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < EPS, "{a} != {b}");
    }

    #[test]
    fn test_default_hitbox_covers_whole_box() {
        let e = entity(10.0, 20.0, 30.0, 40.0);
        assert_eq!(e.hitbox_left(), 10.0);
        assert_eq!(e.hitbox_top(), 20.0);
        assert_eq!(e.hitbox_right(), 40.0);
        assert_eq!(e.hitbox_bottom(), 60.0);
    }

    #[test]
    fn test_hitbox_from_options_is_centered() {
        let e = Entity::new(
            0,
            Vector2F::new(0.0, 0.0),
            Vector2F::new(100.0, 50.0),
            "ship.png",
            EntityOptions::default().with_hitbox(60.0, 10.0)
        );
        assert_eq!(e.hitbox_left(), 20.0);
        assert_eq!(e.hitbox_right(), 80.0);
        assert_eq!(e.hitbox_top(), 20.0);
        assert_eq!(e.hitbox_bottom(), 30.0);
    }

    #[test]
    fn test_origin_shifts_top_left() {
        let mut e = Entity::new(
            0,
            Vector2F::new(50.0, 50.0),
            Vector2F::new(20.0, 10.0),
            "ship.png",
            EntityOptions::default().with_origin(10.0, 5.0)
        );
        assert_eq!(e.top_left(), Vector2F::new(40.0, 45.0));
        assert_eq!(e.x(), 50.0);
        assert_eq!(e.y(), 50.0);

        e.set_x(0.0);
        e.set_y(100.0);
        assert_eq!(e.left(), -10.0);
        assert_eq!(e.top(), 95.0);
        assert_eq!(e.position(), Vector2F::new(0.0, 100.0));
    }

    #[test]
    fn test_right_and_bottom_setters_keep_size() {
        let mut e = entity(0.0, 0.0, 30.0, 40.0);
        e.set_right(100.0);
        e.set_bottom(200.0);
        assert_eq!(e.left(), 70.0);
        assert_eq!(e.top(), 160.0);
        assert_eq!(e.size(), Vector2F::new(30.0, 40.0));
    }

    #[test]
    fn test_resize_rescales_hitbox_proportionally() {
        let mut e = Entity::new(
            0,
            Vector2F::zero(),
            Vector2F::new(100.0, 100.0),
            "a.png",
            EntityOptions::default().with_hitbox(50.0, 20.0)
        );
        e.set_width(200.0);
        assert_close(e.hitbox().left, 50.0);
        assert_close(e.hitbox().right, 150.0);
        assert_close(e.hitbox_right() - e.hitbox_left(), 100.0);
        // height untouched
        assert_close(e.hitbox_bottom() - e.hitbox_top(), 20.0);

        e.set_height(50.0);
        assert_close(e.hitbox().top, 20.0);
        assert_close(e.hitbox().bottom, 30.0);
    }

    #[test]
    fn test_resize_round_trip_restores_offsets() {
        let mut e = Entity::new(
            0,
            Vector2F::new(3.0, 7.0),
            Vector2F::new(64.0, 48.0),
            "a.png",
            EntityOptions::default().with_hitbox(40.0, 30.0)
        );
        let original = e.hitbox();
        let k = 2.75;
        e.resize(Vector2F::new(64.0 * k, 48.0 * k));
        e.resize(Vector2F::new(64.0, 48.0));
        assert_close(e.hitbox().left, original.left);
        assert_close(e.hitbox().top, original.top);
        assert_close(e.hitbox().right, original.right);
        assert_close(e.hitbox().bottom, original.bottom);
    }

    #[test]
    fn test_resize_from_zero_size_does_not_rescale() {
        let mut e = entity(0.0, 0.0, 0.0, 0.0);
        e.resize(Vector2F::new(10.0, 10.0));
        assert!(e.hitbox().left.is_finite());
        assert_eq!(e.hitbox(), Hitbox::default());
        assert_eq!(e.size(), Vector2F::new(10.0, 10.0));

        e.set_hitbox(None, None);
        assert_eq!(e.hitbox().width(), 10.0);
    }

    #[test]
    fn test_set_hitbox_defaults_to_current_size() {
        let mut e = entity(0.0, 0.0, 10.0, 10.0);
        e.resize(Vector2F::new(40.0, 20.0));
        e.set_hitbox(Some(20.0), None);
        assert_eq!(e.hitbox(), Hitbox { left: 10.0, top: 0.0, right: 30.0, bottom: 20.0 });
    }

    #[test]
    fn test_explicit_hitbox_may_exceed_box() {
        let mut e = entity(0.0, 0.0, 10.0, 10.0);
        e.set_hitbox(Some(30.0), Some(30.0));
        assert_eq!(e.hitbox_left(), -10.0);
        assert_eq!(e.hitbox_right(), 20.0);
    }

    #[test]
    fn test_hitbox_width_tracks_mutations() {
        let mut e = Entity::new(
            0,
            Vector2F::new(5.0, 5.0),
            Vector2F::new(10.0, 10.0),
            "a.png",
            EntityOptions::default().with_hitbox(4.0, 6.0)
        );
        e.translate(Vector2F::new(13.0, -2.0));
        e.set_x(-40.0);
        e.set_right(3.0);
        assert_close(e.hitbox_right() - e.hitbox_left(), 4.0);
        e.set_width(30.0);
        assert_close(e.hitbox_right() - e.hitbox_left(), 12.0);
        e.set_bottom(1.0);
        assert_close(e.hitbox_bottom() - e.hitbox_top(), 6.0);
    }

    #[test]
    fn test_collision_is_symmetric_and_strict() {
        let a = entity(0.0, 0.0, 10.0, 10.0);
        let touching = entity(10.0, 0.0, 10.0, 10.0);
        let overlapping = entity(5.0, 5.0, 10.0, 10.0);
        let far = entity(100.0, 100.0, 10.0, 10.0);

        assert!(!a.collided_with(&touching));
        assert!(!touching.collided_with(&a));
        assert!(a.collided_with(&overlapping));
        assert!(overlapping.collided_with(&a));
        assert!(!a.collided_with(&far));
        assert!(!far.collided_with(&a));
    }

    #[test]
    fn test_collision_uses_hitbox_not_box() {
        let small = Entity::new(
            0,
            Vector2F::zero(),
            Vector2F::new(10.0, 10.0),
            "a.png",
            EntityOptions::default().with_hitbox(2.0, 2.0)
        );
        let neighbour = entity(8.0, 0.0, 10.0, 10.0);
        assert!(small.bounds().overlaps(&neighbour.bounds()));
        assert!(!small.collided_with(&neighbour));
    }

    #[test]
    fn test_transform_mirrors_geometry() {
        let mut e = entity(1.0, 2.0, 3.0, 4.0);
        e.set_rotation(45.0);
        e.rotate_by(15.0);
        let t = e.transform();
        assert_eq!(t.top_left, Vector2F::new(1.0, 2.0));
        assert_eq!(t.size, Vector2F::new(3.0, 4.0));
        assert_eq!(t.rotation, 60.0);
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: EntityOptions = serde_json::from_str(r#"{"hitboxWidth": 12.0, "originY": 3.5}"#).unwrap();
        assert_eq!(options.hitbox_width, Some(12.0));
        assert_eq!(options.hitbox_height, None);
        assert_eq!(options.origin_x, 0.0);
        assert_eq!(options.origin_y, 3.5);
    }
}
