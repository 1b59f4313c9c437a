use std::{
    fmt::Debug,
    time::Duration
};

use super::{
    clock::Clock,
    entity::{
        Entity,
        EntityId,
        EntityOptions
    },
    input::{
        InputEvent,
        InputState
    },
    math::Vector2F
};

use crate::{
    config::StageConfig,
    rendering::{
        NodeId,
        Surface,
        SurfaceError
    }
};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Entity {0} does not exist")]
    EntityNotExist(EntityId),

    #[error("Max frame rate must be a positive number, got {0}")]
    InvalidFrameRate(f32),

    #[error("Surface failed, reason='{0}'")]
    SurfaceError(#[from] SurfaceError),
}

/// Per-entity frame logic, run once per frame before any node is synced.
pub trait Behavior<K> {
    fn step(&mut self, _id: EntityId, _stage: &mut Stage<K>) { }
}

impl<K, F> Behavior<K> for F
where
    F: FnMut(EntityId, &mut Stage<K>)
{
    fn step(&mut self, id: EntityId, stage: &mut Stage<K>) {
        self(id, stage)
    }
}

pub type FrameCallback<K> = Box<dyn FnMut(&mut Stage<K>)>;

struct GameObject<K> {
    entity: Entity,
    kind: K,
    node: NodeId,
    behavior: Option<Box<dyn Behavior<K>>>,
}

/// Registry, input table and frame scheduler for one game instance.
///
/// `K` is the type tag carried by every entity and matched by the
/// collision queries.
pub struct Stage<K> {
    surface: Box<dyn Surface>,
    clock: Box<dyn Clock>,
    container_size: Vector2F,
    frame_interval: Duration,
    new_entity_id: EntityId,
    objects: Vec<GameObject<K>>,
    input: InputState,
    last_frame: Duration,
    this_frame: Duration,
    frame_count: u64,
    running: bool,
    on_frame: Option<FrameCallback<K>>,
    on_frame_generation: u64,
}

impl<K> Debug for Stage<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("container_size", &self.container_size)
            .field("frame_interval", &self.frame_interval)
            .field("entities", &self.objects.len())
            .field("frame_count", &self.frame_count)
            .field("running", &self.running)
            .finish()
    }
}

impl<K> Stage<K>
where
    K: Copy + PartialEq + Debug + 'static
{
    pub fn new<S, C>(config: &StageConfig, surface: S, clock: C) -> Result<Self, StageError>
    where
        S: Surface + 'static,
        C: Clock + 'static
    {
        let max_frame_rate = config.max_frame_rate;
        if !max_frame_rate.is_finite() || max_frame_rate <= 0.0 {
            return Err(StageError::InvalidFrameRate(max_frame_rate));
        }

        let frame_interval = Duration::try_from_secs_f64(1.0 / max_frame_rate as f64)
            .map_err(|_| StageError::InvalidFrameRate(max_frame_rate))?;

        let container_size = surface.container_size();
        let now = clock.now();
        log::info!("Stage created, container {container_size}, max {max_frame_rate} fps");

        Ok(Self {
            surface: Box::new(surface),
            clock: Box::new(clock),
            container_size,
            frame_interval,
            new_entity_id: 0,
            objects: vec![],
            input: InputState::new(),
            last_frame: now,
            this_frame: now,
            frame_count: 0,
            running: false,
            on_frame: None,
            on_frame_generation: 0,
        })
    }

    /// Container size as read when the stage was created.
    pub fn container_size(&self) -> Vector2F {
        self.container_size
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Marks the stage running. Returns `false` when it already was.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        if self.frame_count == 0 {
            let now = self.clock.now();
            self.last_frame = now;
            self.this_frame = now;
        }
        self.running = true;
        log::info!("Stage started");
        true
    }

    /// Takes effect once the frame in progress (or already scheduled) completes.
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Stage stopping after {} frames", self.frame_count);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Gap between the two most recent frames, the target interval before any.
    pub fn delta_time(&self) -> Duration {
        if self.frame_count == 0 {
            self.frame_interval
        } else {
            self.this_frame.saturating_sub(self.last_frame)
        }
    }

    pub fn set_on_frame<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Stage<K>) + 'static
    {
        self.on_frame = Some(Box::new(callback));
        self.on_frame_generation += 1;
    }

    pub fn clear_on_frame(&mut self) {
        self.on_frame = None;
        self.on_frame_generation += 1;
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        let now = self.clock.now();
        self.input.handle(event, now);
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.input.is_down(key)
    }

    /// True while the press of `key` lies in the latest frame window
    /// `(last_frame, this_frame]`. The first window also holds presses
    /// stamped at the start instant.
    pub fn is_key_pressed(&self, key: &str) -> bool {
        if self.frame_count == 1 && self.input.pressed_at(key) == Some(self.last_frame) {
            return true;
        }
        self.input.pressed_between(key, self.last_frame, self.this_frame)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = &str> {
        self.input.held_keys()
    }

    pub fn spawn<S: AsRef<str>>(&mut self, kind: K, position: Vector2F, size: Vector2F, sprite: S, options: EntityOptions) -> Result<EntityId, StageError> {
        self.register(kind, position, size, sprite.as_ref(), options, None)
    }

    pub fn spawn_with_behavior<S, B>(&mut self, kind: K, position: Vector2F, size: Vector2F, sprite: S, options: EntityOptions, behavior: B) -> Result<EntityId, StageError>
    where
        S: AsRef<str>,
        B: Behavior<K> + 'static
    {
        self.register(kind, position, size, sprite.as_ref(), options, Some(Box::new(behavior)))
    }

    fn register(&mut self, kind: K, position: Vector2F, size: Vector2F, sprite: &str, options: EntityOptions, behavior: Option<Box<dyn Behavior<K>>>) -> Result<EntityId, StageError> {
        let node = self.surface.create_node(sprite)?;

        let new_id = self.new_entity_id;
        self.new_entity_id += 1;

        let entity = Entity::new(new_id, position, size, sprite, options);
        self.surface.place_node(node, &entity.transform());
        log::debug!("Spawned {kind:?} #{new_id} at {position}, size {size}");

        self.objects.push(GameObject {
            entity,
            kind,
            node,
            behavior,
        });
        Ok(new_id)
    }

    pub fn set_behavior<B: Behavior<K> + 'static>(&mut self, entity_id: EntityId, behavior: B) -> Result<(), StageError> {
        let object = self.object_mut(entity_id)?;
        object.behavior = Some(Box::new(behavior));
        Ok(())
    }

    pub fn set_sprite<S: AsRef<str>>(&mut self, entity_id: EntityId, sprite: S) -> Result<(), StageError> {
        let position = self.position_of(entity_id)?;
        let object = &mut self.objects[position];
        object.entity.set_sprite(sprite.as_ref());
        self.surface.set_node_sprite(object.node, sprite.as_ref());
        Ok(())
    }

    /// Pushes the entity's transform to its node now rather than at frame end.
    pub fn update_position(&mut self, entity_id: EntityId) -> Result<(), StageError> {
        let position = self.position_of(entity_id)?;
        let object = &self.objects[position];
        self.surface.place_node(object.node, &object.entity.transform());
        Ok(())
    }

    /// Deregisters the entity and destroys its node.
    pub fn kill(&mut self, entity_id: EntityId) -> Result<(), StageError> {
        let position = self.position_of(entity_id)?;
        let object = self.objects.remove(position);
        self.surface.remove_node(object.node);
        log::debug!("Killed {:?} #{entity_id}", object.kind);
        Ok(())
    }

    pub fn remove_all_game_objects(&mut self) {
        log::debug!("Removing all {} entities", self.objects.len());
        for object in self.objects.drain(..) {
            self.surface.remove_node(object.node);
        }
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<&Entity> {
        self.objects.iter()
            .find(|o| o.entity.id == entity_id)
            .map(|o| &o.entity)
    }

    pub fn entity_mut(&mut self, entity_id: EntityId) -> Option<&mut Entity> {
        self.objects.iter_mut()
            .find(|o| o.entity.id == entity_id)
            .map(|o| &mut o.entity)
    }

    pub fn kind_of(&self, entity_id: EntityId) -> Option<K> {
        self.objects.iter()
            .find(|o| o.entity.id == entity_id)
            .map(|o| o.kind)
    }

    pub fn node_of(&self, entity_id: EntityId) -> Option<NodeId> {
        self.objects.iter()
            .find(|o| o.entity.id == entity_id)
            .map(|o| o.node)
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.position_of(entity_id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Live entities in registration order.
    pub fn iter_entities(&self) -> impl Iterator<Item = (&Entity, K)> {
        self.objects.iter().map(|o| (&o.entity, o.kind))
    }

    pub fn ids_of_kind(&self, kind: K) -> Vec<EntityId> {
        self.objects.iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.entity.id)
            .collect()
    }

    /// Whether any other live entity tagged `kind` overlaps `entity_id`.
    pub fn object_collided_with_type(&self, entity_id: EntityId, kind: K) -> bool {
        let Some(entity) = self.entity(entity_id) else {
            return false;
        };
        self.objects.iter()
            .any(|o| o.entity.id != entity_id && o.kind == kind && entity.collided_with(&o.entity))
    }

    /// Every other live entity tagged `kind` overlapping `entity_id`, in registration order.
    pub fn collisions_with_type(&self, entity_id: EntityId, kind: K) -> Vec<EntityId> {
        let Some(entity) = self.entity(entity_id) else {
            return vec![];
        };
        self.objects.iter()
            .filter(|o| o.entity.id != entity_id && o.kind == kind && entity.collided_with(&o.entity))
            .map(|o| o.entity.id)
            .collect()
    }

    /// `None` when either entity is not live.
    pub fn collided(&self, first: EntityId, second: EntityId) -> Option<bool> {
        Some(self.entity(first)?.collided_with(self.entity(second)?))
    }

    /// Runs one frame: the global callback, every behavior in registration
    /// order, then every node sync. Returns the delay before the next frame,
    /// or `None` once the stage is stopped.
    pub fn do_steps(&mut self) -> Option<Duration> {
        let frame_started = self.clock.now();
        log::trace!("Frame {} start", self.frame_count);

        self.run_on_frame();
        self.run_behaviors();
        self.sync_nodes();

        let now = self.clock.now();
        self.last_frame = self.this_frame;
        self.this_frame = now;
        self.frame_count += 1;

        if self.running {
            let work = now.saturating_sub(frame_started);
            Some(self.frame_interval.saturating_sub(work))
        } else {
            log::debug!("Stage stopped, no further frame scheduled");
            None
        }
    }

    fn run_on_frame(&mut self) {
        if let Some(mut callback) = self.on_frame.take() {
            let generation = self.on_frame_generation;
            callback(self);
            if self.on_frame_generation == generation {
                self.on_frame = Some(callback);
            }
        }
    }

    fn run_behaviors(&mut self) {
        // Entities spawned during this pass wait for the next frame.
        let ids: Vec<EntityId> = self.objects.iter().map(|o| o.entity.id).collect();
        for id in ids {
            let Ok(position) = self.position_of(id) else {
                continue;
            };
            let Some(mut behavior) = self.objects[position].behavior.take() else {
                continue;
            };

            behavior.step(id, self);

            if let Ok(object) = self.object_mut(id) {
                if object.behavior.is_none() {
                    object.behavior = Some(behavior);
                }
            }
        }
    }

    fn sync_nodes(&mut self) {
        for object in self.objects.iter() {
            self.surface.place_node(object.node, &object.entity.transform());
        }
    }

    fn position_of(&self, entity_id: EntityId) -> Result<usize, StageError> {
        self.objects.iter()
            .position(|o| o.entity.id == entity_id)
            .ok_or(StageError::EntityNotExist(entity_id))
    }

    fn object_mut(&mut self, entity_id: EntityId) -> Result<&mut GameObject<K>, StageError> {
        self.objects.iter_mut()
            .find(|o| o.entity.id == entity_id)
            .ok_or(StageError::EntityNotExist(entity_id))
    }
}
