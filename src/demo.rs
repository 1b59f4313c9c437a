use std::{
    cell::Cell,
    rc::Rc
};

use crate::{
    game::{
        entity::{
            EntityId,
            EntityOptions
        },
        math::Vector2F,
        stage::{
            Behavior,
            Stage,
            StageError
        }
    },
    TOUCH_KEY
};

pub const PLAYER_SPRITE: &str = "assets/player.png";
pub const COIN_SPRITE: &str = "assets/coin.png";

const PLAYER_SIZE: f32 = 32.0;
const COIN_SIZE: f32 = 24.0;
const COIN_HITBOX: f32 = 16.0;
/// Degrees per second.
const COIN_SPIN: f32 = 90.0;

const SCORE_LOG_PERIOD: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    Player,
    Coin,
}

#[derive(Debug, Clone)]
pub struct DemoSettings {
    pub coins: usize,
    /// Pixels per second.
    pub player_speed: f32,
    pub autopilot: bool,
    pub frame_limit: Option<u64>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            coins: 8,
            player_speed: 240.0,
            autopilot: false,
            frame_limit: None,
        }
    }
}

/// Coins collected so far, readable from outside the stage.
#[derive(Debug, Clone, Default)]
pub struct Score(Rc<Cell<u32>>);

impl Score {
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    fn increment(&self) -> u32 {
        self.0.set(self.0.get() + 1);
        self.0.get()
    }
}

#[derive(Debug)]
pub struct DemoHandle {
    pub player: EntityId,
    pub score: Score,
}

/// Arrow keys move the player, space or a touch toggles the autopilot,
/// touching a coin collects it and drops a new one somewhere else.
pub struct PlayerBehavior {
    speed: f32,
    autopilot: bool,
    score: Score,
}

impl PlayerBehavior {
    fn keyboard_direction(stage: &Stage<DemoKind>) -> Vector2F {
        let mut direction = Vector2F::zero();
        if stage.is_key_down("ArrowLeft") {
            direction.x -= 1.0;
        }
        if stage.is_key_down("ArrowRight") {
            direction.x += 1.0;
        }
        if stage.is_key_down("ArrowUp") {
            direction.y -= 1.0;
        }
        if stage.is_key_down("ArrowDown") {
            direction.y += 1.0;
        }
        direction
    }

    fn autopilot_direction(id: EntityId, stage: &Stage<DemoKind>) -> Vector2F {
        let Some(player) = stage.entity(id) else {
            return Vector2F::zero();
        };
        let center = player.center();

        stage.iter_entities()
            .filter(|(_, kind)| *kind == DemoKind::Coin)
            .map(|(coin, _)| coin.center() - center)
            .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
            .unwrap_or_else(Vector2F::zero)
    }
}

impl Behavior<DemoKind> for PlayerBehavior {
    fn step(&mut self, id: EntityId, stage: &mut Stage<DemoKind>) {
        if stage.is_key_pressed(" ") || stage.is_key_pressed(TOUCH_KEY) {
            self.autopilot = !self.autopilot;
            log::info!("Autopilot {}", if self.autopilot { "on" } else { "off" });
        }

        let direction = if self.autopilot {
            Self::autopilot_direction(id, stage)
        } else {
            Self::keyboard_direction(stage)
        };

        let dt = stage.delta_time().as_secs_f32();
        let container = stage.container_size();
        let Some(player) = stage.entity_mut(id) else {
            return;
        };

        if direction != Vector2F::zero() {
            player.translate(direction.normal() * (self.speed * dt));
            player.set_rotation(direction.y.atan2(direction.x).to_degrees());
        }

        // keep the sprite inside the container
        let push_x = (-player.left()).max(0.0) - (player.right() - container.x).max(0.0);
        let push_y = (-player.top()).max(0.0) - (player.bottom() - container.y).max(0.0);
        player.translate(Vector2F::new(push_x, push_y));

        for coin in stage.collisions_with_type(id, DemoKind::Coin) {
            if stage.kill(coin).is_ok() {
                let score = self.score.increment();
                log::info!("Coin #{coin} collected, score {score}");
            }
            if let Err(e) = spawn_coin(stage) {
                log::warn!("Could not respawn coin, reason='{e}'");
            }
        }
    }
}

fn random_coordinate(extent: f32) -> f32 {
    let margin = COIN_SIZE;
    if extent <= margin * 2.0 {
        return extent / 2.0;
    }
    rand::random_range(margin..extent - margin)
}

/// Drops a spinning coin at a random spot of the container.
pub fn spawn_coin(stage: &mut Stage<DemoKind>) -> Result<EntityId, StageError> {
    let container = stage.container_size();
    let size = Vector2F::new(COIN_SIZE, COIN_SIZE);
    let position = Vector2F::new(random_coordinate(container.x), random_coordinate(container.y));

    stage.spawn_with_behavior(
        DemoKind::Coin,
        position,
        size,
        COIN_SPRITE,
        EntityOptions::default()
            .centered(size)
            .with_hitbox(COIN_HITBOX, COIN_HITBOX),
        |id: EntityId, stage: &mut Stage<DemoKind>| {
            let dt = stage.delta_time().as_secs_f32();
            if let Some(coin) = stage.entity_mut(id) {
                coin.rotate_by(COIN_SPIN * dt);
            }
        }
    )
}

/// Populates `stage` with the collector game.
pub fn setup(stage: &mut Stage<DemoKind>, settings: &DemoSettings) -> Result<DemoHandle, StageError> {
    let score = Score::default();
    let size = Vector2F::new(PLAYER_SIZE, PLAYER_SIZE);
    let container = stage.container_size();

    let player = stage.spawn_with_behavior(
        DemoKind::Player,
        container * 0.5,
        size,
        PLAYER_SPRITE,
        EntityOptions::default().centered(size),
        PlayerBehavior {
            speed: settings.player_speed,
            autopilot: settings.autopilot,
            score: score.clone(),
        }
    )?;

    for _ in 0..settings.coins {
        spawn_coin(stage)?;
    }

    let frame_limit = settings.frame_limit;
    let frame_score = score.clone();
    stage.set_on_frame(move |stage| {
        let frame = stage.frame_count();
        if frame > 0 && frame % SCORE_LOG_PERIOD == 0 {
            log::debug!("Frame {frame}, score {}", frame_score.get());
        }
        if frame_limit.is_some_and(|limit| frame + 1 >= limit) {
            log::info!("Frame limit reached");
            stage.stop();
        }
    });

    log::info!("Collector ready, {} coins", settings.coins);
    Ok(DemoHandle { player, score })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::StageConfig,
        game::{
            clock::ManualClock,
            input::InputEvent
        },
        rendering::SceneSurface
    };

    fn stage() -> (Stage<DemoKind>, ManualClock) {
        let clock = ManualClock::new();
        let surface = SceneSurface::new(Vector2F::new(800.0, 600.0));
        let stage = Stage::new(&StageConfig::default(), surface, clock.clone()).unwrap();
        (stage, clock)
    }

    fn frames(stage: &mut Stage<DemoKind>, clock: &ManualClock, count: usize) {
        for _ in 0..count {
            clock.advance(Duration::from_millis(16));
            stage.do_steps();
        }
    }

    #[test]
    fn test_setup_spawns_player_and_coins() {
        let (mut stage, _) = stage();
        let settings = DemoSettings { coins: 5, ..Default::default() };
        let handle = setup(&mut stage, &settings).unwrap();

        assert_eq!(stage.kind_of(handle.player), Some(DemoKind::Player));
        assert_eq!(stage.ids_of_kind(DemoKind::Coin).len(), 5);
        assert_eq!(stage.entity(handle.player).unwrap().position(), Vector2F::new(400.0, 300.0));
        for id in stage.ids_of_kind(DemoKind::Coin) {
            let coin = stage.entity(id).unwrap();
            assert!(coin.left() >= 0.0 && coin.right() <= 800.0);
            assert_eq!(coin.hitbox_rect().size, Vector2F::new(COIN_HITBOX, COIN_HITBOX));
        }
    }

    #[test]
    fn test_arrow_key_moves_player() {
        let (mut stage, clock) = stage();
        let handle = setup(&mut stage, &DemoSettings { coins: 0, ..Default::default() }).unwrap();

        stage.handle_input(&InputEvent::key_down("ArrowRight"));
        frames(&mut stage, &clock, 10);

        let player = stage.entity(handle.player).unwrap();
        assert!(player.x() > 400.0);
        assert_eq!(player.y(), 300.0);
        assert_eq!(player.rotation(), 0.0);
    }

    #[test]
    fn test_player_stays_inside_container() {
        let (mut stage, clock) = stage();
        let settings = DemoSettings { coins: 0, player_speed: 5000.0, ..Default::default() };
        let handle = setup(&mut stage, &settings).unwrap();

        stage.handle_input(&InputEvent::key_down("ArrowUp"));
        stage.handle_input(&InputEvent::key_down("ArrowLeft"));
        frames(&mut stage, &clock, 20);

        let player = stage.entity(handle.player).unwrap();
        assert!(player.left().abs() < 1e-3, "{}", player.left());
        assert!(player.top().abs() < 1e-3, "{}", player.top());
    }

    #[test]
    fn test_autopilot_collects_coins() {
        let (mut stage, clock) = stage();
        let settings = DemoSettings { coins: 1, player_speed: 600.0, autopilot: true, frame_limit: None };
        let handle = setup(&mut stage, &settings).unwrap();

        frames(&mut stage, &clock, 300);
        assert!(handle.score.get() >= 1);
        // every collected coin is replaced
        assert_eq!(stage.ids_of_kind(DemoKind::Coin).len(), 1);
    }

    #[test]
    fn test_space_toggles_autopilot() {
        let (mut stage, clock) = stage();
        let settings = DemoSettings { coins: 1, ..Default::default() };
        let handle = setup(&mut stage, &settings).unwrap();
        frames(&mut stage, &clock, 1);

        clock.advance(Duration::from_millis(4));
        stage.handle_input(&InputEvent::key_down(" "));
        frames(&mut stage, &clock, 3);
        stage.handle_input(&InputEvent::key_up(" "));

        // without any arrow held, only the autopilot can have moved the player
        assert_ne!(stage.entity(handle.player).unwrap().position(), Vector2F::new(400.0, 300.0));
    }

    #[test]
    fn test_frame_limit_stops_stage() {
        let (mut stage, clock) = stage();
        let settings = DemoSettings { coins: 2, frame_limit: Some(4), ..Default::default() };
        setup(&mut stage, &settings).unwrap();
        stage.start();

        let mut frames_run = 0;
        loop {
            clock.advance(Duration::from_millis(16));
            frames_run += 1;
            if stage.do_steps().is_none() {
                break;
            }
        }
        assert_eq!(frames_run, 4);
        assert_eq!(stage.frame_count(), 4);
    }
}
