use std::{
    fmt::Debug,
    sync::Arc,
    time::Instant
};

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{
        ElementState,
        TouchPhase,
        WindowEvent
    },
    event_loop::{
        ActiveEventLoop,
        ControlFlow,
        EventLoop
    },
    keyboard::{
        Key,
        NamedKey
    },
    window::{
        Window,
        WindowId
    }
};

use crate::{
    game::{
        input::InputEvent,
        stage::Stage
    },
    rendering::{
        renderer::{
            Renderer,
            RendererError
        },
        Scene
    }
};

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Event loop failed, reason='{0}'")]
    EventLoopError(#[from] winit::error::EventLoopError),

    #[error("Could not open window, reason='{0}'")]
    OsError(#[from] winit::error::OsError),

    #[error(transparent)]
    RendererError(#[from] RendererError),
}

/// Browser `KeyboardEvent.key` name for a winit key.
pub fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Named(NamedKey::Space) => Some(String::from(" ")),
        Key::Named(named) => Some(format!("{named:?}")),
        Key::Character(text) => Some(text.to_string()),
        _ => None,
    }
}

pub fn touch_event(phase: TouchPhase) -> Option<InputEvent> {
    match phase {
        TouchPhase::Started => Some(InputEvent::TouchStart),
        TouchPhase::Ended | TouchPhase::Cancelled => Some(InputEvent::TouchEnd),
        TouchPhase::Moved => None,
    }
}

/// Hosts a stage in a native window, painting its scene every frame.
struct StageWindow<K> {
    title: String,
    stage: Stage<K>,
    scene: Scene,
    renderer: Option<Renderer>,
    next_frame: Option<Instant>,
    error: Option<WindowError>,
}

impl<K> StageWindow<K>
where
    K: Copy + PartialEq + Debug + 'static
{
    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<(), WindowError> {
        let container_size = self.stage.container_size();
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(container_size.x, container_size.y))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let renderer = pollster::block_on(Renderer::new(window.clone(), container_size))?;
        window.request_redraw();
        self.renderer = Some(renderer);
        Ok(())
    }
}

impl<K> ApplicationHandler for StageWindow<K>
where
    K: Copy + PartialEq + Debug + 'static
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(e) = self.open(event_loop) {
            log::error!("{e}");
            self.error = Some(e);
            event_loop.exit();
            return;
        }

        self.stage.start();
        self.next_frame = Some(Instant::now());
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                self.stage.stop();
                event_loop.exit();
            },
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(e) = renderer.render(&self.scene.borrow()) {
                        log::error!("Render failed: {e}");
                    }
                }
            },
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
            },
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = key_name(&event.logical_key) else {
                    return;
                };
                let input = match event.state {
                    ElementState::Pressed => InputEvent::key_down(key),
                    ElementState::Released => InputEvent::key_up(key),
                };
                self.stage.handle_input(&input);
            },
            WindowEvent::Touch(touch) => {
                if let Some(input) = touch_event(touch.phase) {
                    self.stage.handle_input(&input);
                }
            },
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(next_frame) = self.next_frame else {
            return;
        };

        let now = Instant::now();
        if now >= next_frame {
            let Some(delay) = self.stage.do_steps() else {
                log::info!("Stage stopped, closing window");
                event_loop.exit();
                return;
            };
            self.next_frame = Some(now + delay);
            if let Some(renderer) = self.renderer.as_ref() {
                renderer.get_window().request_redraw();
            }
        }

        if let Some(next_frame) = self.next_frame {
            event_loop.set_control_flow(ControlFlow::WaitUntil(next_frame));
        }
    }
}

/// Runs `stage` in a window until it stops or the window is closed.
/// `scene` must be the node table of the stage's surface.
pub fn run_window<K>(stage: Stage<K>, scene: Scene, title: &str) -> Result<(), WindowError>
where
    K: Copy + PartialEq + Debug + 'static
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = StageWindow {
        title: title.to_string(),
        stage,
        scene,
        renderer: None,
        next_frame: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[test]
fn test_key_names_follow_browser_convention() {
    assert_eq!(key_name(&Key::Named(NamedKey::ArrowUp)).as_deref(), Some("ArrowUp"));
    assert_eq!(key_name(&Key::Named(NamedKey::Escape)).as_deref(), Some("Escape"));
    assert_eq!(key_name(&Key::Named(NamedKey::Space)).as_deref(), Some(" "));
    assert_eq!(key_name(&Key::Character("a".into())).as_deref(), Some("a"));
    assert_eq!(key_name(&Key::Dead(None)), None);
}

#[test]
fn test_touch_phases_map_to_touch_events() {
    assert_eq!(touch_event(TouchPhase::Started), Some(InputEvent::TouchStart));
    assert_eq!(touch_event(TouchPhase::Ended), Some(InputEvent::TouchEnd));
    assert_eq!(touch_event(TouchPhase::Cancelled), Some(InputEvent::TouchEnd));
    assert_eq!(touch_event(TouchPhase::Moved), None);
}
