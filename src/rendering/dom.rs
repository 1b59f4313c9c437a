//! Browser host: one absolutely positioned `div` per entity inside a
//! container element, a `performance.now()` clock and a `setTimeout` driven
//! frame loop.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    rc::Rc,
    time::Duration
};

use wasm_bindgen::{
    prelude::*,
    JsCast
};

use web_sys::{
    Document,
    HtmlElement
};

use crate::{
    config::StageConfig,
    demo::{
        self,
        DemoSettings
    },
    game::{
        clock::Clock,
        entity::NodeTransform,
        input::InputEvent,
        math::Vector2F,
        stage::Stage
    }
};

use super::{
    timeout_millis,
    NodeId,
    Surface,
    SurfaceError
};

fn js_error(error: JsValue) -> SurfaceError {
    SurfaceError::NodeCreation(format!("{error:?}"))
}

fn set_style(node: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = node.style().set_property(property, value) {
        log::warn!("Could not set '{property}' to '{value}': {e:?}");
    }
}

pub struct DomSurface {
    document: Document,
    container: HtmlElement,
    container_size: Vector2F,
    next_node_id: NodeId,
    nodes: HashMap<NodeId, HtmlElement>,
}

impl DomSurface {
    /// Looks the container up by id and measures it once.
    pub fn new(container_id: &str) -> Result<Self, SurfaceError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or(SurfaceError::NoDocument)?;

        let container = document
            .get_element_by_id(container_id)
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| SurfaceError::ContainerNotFound(container_id.to_string()))?;

        let rect = container.get_bounding_client_rect();
        let container_size = Vector2F::new(rect.width() as f32, rect.height() as f32);
        set_style(&container, "position", "relative");
        set_style(&container, "overflow", "hidden");

        Ok(Self {
            document,
            container,
            container_size,
            next_node_id: 0,
            nodes: HashMap::new(),
        })
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }
}

impl Surface for DomSurface {
    fn container_size(&self) -> Vector2F {
        self.container_size
    }

    fn create_node(&mut self, sprite: &str) -> Result<NodeId, SurfaceError> {
        let node = self.document
            .create_element("div")
            .map_err(js_error)?
            .dyn_into::<HtmlElement>()
            .map_err(|element| SurfaceError::NodeCreation(format!("{element:?} is not an HTML element")))?;

        set_style(&node, "position", "absolute");
        set_style(&node, "background-size", "100% 100%");
        set_style(&node, "background-image", &format!("url(\"{sprite}\")"));
        self.container.append_child(&node).map_err(js_error)?;

        let node_id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(node_id, node);
        Ok(node_id)
    }

    fn set_node_sprite(&mut self, node: NodeId, sprite: &str) {
        if let Some(element) = self.nodes.get(&node) {
            set_style(element, "background-image", &format!("url(\"{sprite}\")"));
        }
    }

    fn place_node(&mut self, node: NodeId, transform: &NodeTransform) {
        let Some(element) = self.nodes.get(&node) else {
            return;
        };
        set_style(element, "left", &format!("{}px", transform.top_left.x));
        set_style(element, "top", &format!("{}px", transform.top_left.y));
        set_style(element, "width", &format!("{}px", transform.size.x));
        set_style(element, "height", &format!("{}px", transform.size.y));
        set_style(element, "transform", &format!("rotate({}deg)", transform.rotation));
    }

    fn remove_node(&mut self, node: NodeId) {
        match self.nodes.remove(&node) {
            Some(element) => element.remove(),
            None => log::warn!("Node {node} already removed"),
        }
    }
}

/// Milliseconds from `performance.now()`, zero when unavailable.
#[derive(Debug, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| Duration::from_secs_f64(performance.now().max(0.0) / 1000.0))
            .unwrap_or_default()
    }
}

fn forward_input<K>(stage: &Rc<RefCell<Stage<K>>>, event: InputEvent)
where
    K: Copy + PartialEq + Debug + 'static
{
    match stage.try_borrow_mut() {
        Ok(mut stage) => stage.handle_input(&event),
        Err(_) => log::warn!("Stage busy, dropped {event:?}"),
    }
}

/// Feeds document key events and container touch events into `stage`.
pub fn listen_input<K>(stage: Rc<RefCell<Stage<K>>>, container: &HtmlElement) -> Result<(), JsValue>
where
    K: Copy + PartialEq + Debug + 'static
{
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let key_stage = stage.clone();
    let on_key_down = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(move |event: web_sys::KeyboardEvent| {
        forward_input(&key_stage, InputEvent::key_down(event.key()));
    });
    document.add_event_listener_with_callback("keydown", on_key_down.as_ref().unchecked_ref())?;
    on_key_down.forget();

    let key_stage = stage.clone();
    let on_key_up = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(move |event: web_sys::KeyboardEvent| {
        forward_input(&key_stage, InputEvent::key_up(event.key()));
    });
    document.add_event_listener_with_callback("keyup", on_key_up.as_ref().unchecked_ref())?;
    on_key_up.forget();

    let touch_stage = stage.clone();
    let on_touch_start = Closure::<dyn FnMut(web_sys::TouchEvent)>::new(move |_: web_sys::TouchEvent| {
        forward_input(&touch_stage, InputEvent::TouchStart);
    });
    container.add_event_listener_with_callback("touchstart", on_touch_start.as_ref().unchecked_ref())?;
    on_touch_start.forget();

    let on_touch_end = Closure::<dyn FnMut(web_sys::TouchEvent)>::new(move |_: web_sys::TouchEvent| {
        forward_input(&stage, InputEvent::TouchEnd);
    });
    container.add_event_listener_with_callback("touchend", on_touch_end.as_ref().unchecked_ref())?;
    on_touch_end.forget();

    Ok(())
}

/// Starts `stage` and reschedules `do_steps` through `setTimeout` until it stops.
pub fn run_stage<K>(stage: Rc<RefCell<Stage<K>>>) -> Result<(), JsValue>
where
    K: Copy + PartialEq + Debug + 'static
{
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next_tick = tick.clone();
    let timer_window = window.clone();
    let frame_stage = stage.clone();

    *tick.borrow_mut() = Some(Closure::new(move || {
        let delay = match frame_stage.try_borrow_mut() {
            Ok(mut stage) => stage.do_steps(),
            Err(_) => Some(Duration::ZERO),
        };
        let Some(delay) = delay else {
            log::info!("Stage loop finished");
            return;
        };
        if let Some(callback) = next_tick.borrow().as_ref() {
            let result = timer_window.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                timeout_millis(delay)
            );
            if let Err(e) = result {
                log::error!("Could not schedule frame: {e:?}");
            }
        }
    }));

    stage.borrow_mut().start();
    if let Some(callback) = tick.borrow().as_ref() {
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), 0)?;
    }
    Ok(())
}

/// Runs the collector demo inside the element with id `container_id`.
#[wasm_bindgen]
pub fn run_demo(container_id: &str) -> Result<(), JsValue> {
    let config = StageConfig {
        container_id: container_id.to_string(),
        ..Default::default()
    };
    let surface = DomSurface::new(&config.container_id).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let container = surface.container().clone();

    let mut stage = Stage::new(&config, surface, PerformanceClock)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    demo::setup(&mut stage, &DemoSettings::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let stage = Rc::new(RefCell::new(stage));
    listen_input(stage.clone(), &container)?;
    run_stage(stage)
}
