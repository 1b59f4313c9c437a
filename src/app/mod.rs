#[cfg(not(target_arch = "wasm32"))]
pub mod window;

use std::fmt::Debug;

use tokio::sync::mpsc;

use crate::game::{
    input::InputEvent,
    stage::Stage
};

/// Asynchronous signals delivered to a running stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSignal {
    Input(InputEvent),
    Stop,
}

/// Sending side handed to whoever produces input or wants the loop stopped.
#[derive(Debug, Clone)]
pub struct StageHandle {
    signal_sender: mpsc::UnboundedSender<StageSignal>,
}

impl StageHandle {
    pub fn channel() -> (StageHandle, mpsc::UnboundedReceiver<StageSignal>) {
        let (signal_sender, signal_receiver) = mpsc::unbounded_channel();
        (StageHandle { signal_sender }, signal_receiver)
    }

    /// Returns `false` once the loop is gone.
    pub fn send_input(&self, event: InputEvent) -> bool {
        self.signal_sender.send(StageSignal::Input(event)).is_ok()
    }

    pub fn stop(&self) -> bool {
        self.signal_sender.send(StageSignal::Stop).is_ok()
    }
}

/// Drives `stage` until it is stopped, either by a behavior calling
/// [`Stage::stop`] or by a [`StageSignal::Stop`].
///
/// Signals are applied as soon as they arrive, including while the loop sleeps
/// between frames. A stop observed during the sleep still lets the already
/// scheduled frame run.
pub async fn run_stage<K>(stage: &mut Stage<K>, signals: &mut mpsc::UnboundedReceiver<StageSignal>)
where
    K: Copy + PartialEq + Debug + 'static
{
    stage.start();
    let mut signals_open = true;

    while let Some(delay) = stage.do_steps() {
        let next_frame = tokio::time::sleep(delay);
        tokio::pin!(next_frame);

        loop {
            tokio::select! {
                _ = &mut next_frame => {
                    break;
                },
                signal = signals.recv(), if signals_open => {
                    match signal {
                        Some(StageSignal::Input(event)) => stage.handle_input(&event),
                        Some(StageSignal::Stop) => {
                            log::debug!("Received stage stop signal...");
                            stage.stop();
                        },
                        None => {
                            log::trace!("Signal channel closed");
                            signals_open = false;
                        },
                    }
                },
            }
        }
    }

    log::info!("Stage loop finished after {} frames", stage.frame_count());
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        rc::Rc,
        time::Duration
    };

    use super::*;
    use crate::{
        config::StageConfig,
        game::{
            clock::TokioClock,
            entity::{
                EntityId,
                EntityOptions
            },
            math::Vector2F
        },
        rendering::SceneSurface
    };

    fn stage() -> Stage<u8> {
        let config = StageConfig { max_frame_rate: 50.0, ..Default::default() };
        Stage::new(&config, SceneSurface::new(Vector2F::new(100.0, 100.0)), TokioClock::new()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_at_frame_interval_until_stopped() {
        let mut stage = stage();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let recorded = deltas.clone();
        stage.set_on_frame(move |stage| {
            recorded.borrow_mut().push(stage.delta_time());
            if stage.frame_count() == 5 {
                stage.stop();
            }
        });

        let (_handle, mut signals) = StageHandle::channel();
        let started = tokio::time::Instant::now();
        run_stage(&mut stage, &mut signals).await;

        assert_eq!(stage.frame_count(), 6);
        assert!(!stage.is_running());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(105), "{elapsed:?}");
        // first frame sees the target interval, later ones the measured gap
        assert_eq!(deltas.borrow()[0], Duration::from_millis(20));
        assert!(
            deltas.borrow()[2..].iter().all(|d| *d >= Duration::from_millis(20) && *d < Duration::from_millis(21)),
            "{:?}", deltas.borrow()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_ends_loop_after_scheduled_frame() {
        let mut stage = stage();
        let (handle, mut signals) = StageHandle::channel();
        stage.set_on_frame(move |stage| {
            if stage.frame_count() == 3 {
                handle.stop();
            }
        });

        run_stage(&mut stage, &mut signals).await;
        // the stop lands during the sleep after frame 4, frame 5 still runs
        assert_eq!(stage.frame_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_signals_reach_behaviors() {
        let mut stage = stage();
        let (handle, mut signals) = StageHandle::channel();
        let seen_pressed = Rc::new(RefCell::new(Vec::new()));
        let seen = seen_pressed.clone();

        stage.spawn_with_behavior(
            1,
            Vector2F::zero(),
            Vector2F::new(1.0, 1.0),
            "p.png",
            EntityOptions::default(),
            move |_: EntityId, stage: &mut Stage<u8>| {
                seen.borrow_mut().push((stage.frame_count(), stage.is_key_pressed(" ")));
                if stage.frame_count() == 6 {
                    stage.stop();
                }
            }
        ).unwrap();

        let sender = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            sender.send_input(InputEvent::key_down(" "));
        });

        run_stage(&mut stage, &mut signals).await;
        drop(signals);
        assert!(!handle.send_input(InputEvent::key_up(" ")));

        let pressed_frames: Vec<u64> = seen_pressed.borrow()
            .iter()
            .filter(|(_, pressed)| *pressed)
            .map(|(frame, _)| *frame)
            .collect();
        assert_eq!(pressed_frames.len(), 1, "{:?}", seen_pressed.borrow());
    }
}
