//! Native demo host painter: draws the retained scene as tinted quads so the
//! window driver has something to show. Entity logic never depends on it.

use std::{
    borrow::Cow,
    sync::Arc
};

use bytemuck::{
    Pod,
    Zeroable
};

use wgpu::{
    util::DeviceExt, Device, RenderPipeline, Surface
};

use winit::window::Window;

use crate::game::{
    entity::NodeTransform,
    math::Vector2F
};

use super::SceneNodes;

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("No suitable graphics adapter")]
    AdapterUnavailable,

    #[error("Could not create surface, reason='{0}'")]
    CreateSurfaceError(#[from] wgpu::CreateSurfaceError),

    #[error("Could not acquire device, reason='{0}'")]
    RequestDeviceError(#[from] wgpu::RequestDeviceError),

    #[error("Could not acquire frame, reason='{0}'")]
    SurfaceError(#[from] wgpu::SurfaceError),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Vertex {
    _pos: [f32; 4],
}

impl Vertex {
    fn from_position(x: f32, y: f32) -> Self {
        Vertex {
            _pos: [x, y, 1.0, 1.0]
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Uniforms {
    color: [f32; 4],
}

/// Maps a node in container pixels (y down) to a rotated NDC quad.
fn create_ndc_node_quad_vertices(transform: &NodeTransform, container_size: Vector2F) -> (Vec<Vertex>, Vec<u16>) {
    let half = transform.size * 0.5;
    let center = transform.top_left + half;
    let corners = [
        Vector2F::new(-half.x, half.y),    // Bottom-left
        Vector2F::new(half.x, half.y),     // Bottom-right
        Vector2F::new(half.x, -half.y),    // Top-right
        Vector2F::new(-half.x, -half.y),   // Top-left
    ];

    let vertex_data = corners
        .iter()
        .map(|corner| {
            let pixel = center + corner.rotated(transform.rotation);
            Vertex::from_position(
                (pixel.x / container_size.x) * 2.0 - 1.0,
                1.0 - (pixel.y / container_size.y) * 2.0
            )
        })
        .collect();

    let indices_data = vec![
        0, 1, 2, // First triangle
        2, 3, 0, // Second triangle
    ];

    (vertex_data, indices_data)
}

/// Stable tint for a sprite reference; images themselves are not decoded.
pub fn sprite_color(sprite: &str) -> [f32; 4] {
    // FNV-1a
    let hash = sprite.bytes().fold(0x811c9dc5u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(0x01000193)
    });
    let channel = |shift: u32| 0.25 + ((hash >> shift) & 0xff) as f32 / 255.0 * 0.75;
    [channel(0), channel(8), channel(16), 1.0]
}

pub struct Renderer {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: winit::dpi::PhysicalSize<u32>,
    surface: wgpu::Surface<'static>,
    surface_format: wgpu::TextureFormat,
    render_pipeline: RenderPipeline,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    container_size: Vector2F,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, container_size: Vector2F) -> Result<Renderer, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or(RendererError::AdapterUnavailable)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor::default(),
                None
            )
            .await?;

        let size = window.inner_size();

        let surface = instance.create_surface(window.clone())?;
        let cap = surface.get_capabilities(&adapter);
        let surface_format = cap.formats[0];

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let render_pipeline = Self::prepare_pipeline(
            &device,
            &surface,
            &adapter,
            &uniform_bind_group_layout
        );

        let state = Renderer {
            window,
            device,
            queue,
            size,
            surface,
            surface_format,
            render_pipeline,
            uniform_bind_group_layout,
            container_size,
        };

        state.configure_surface();
        log::info!("Renderer ready, surface {:?}, {}x{}", surface_format, size.width, size.height);

        Ok(state)
    }

    fn prepare_pipeline(
        device: &Device,
        surface: &Surface,
        adapter: &wgpu::Adapter,
        uniform_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Node Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shader.wgsl"))),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Node Pipeline Layout"),
            bind_group_layouts: &[uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        };

        let swapchain_capabilities = surface.get_capabilities(adapter);
        let swapchain_format = swapchain_capabilities.formats[0];

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Node Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(swapchain_format.into())],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    pub fn get_window(&self) -> &Window {
        &self.window
    }

    fn configure_surface(&self) {
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.surface_format,
            view_formats: vec![self.surface_format.add_srgb_suffix()],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            width: self.size.width.max(1),
            height: self.size.height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: wgpu::PresentMode::AutoVsync,
        };
        self.surface.configure(&self.device, &surface_config);
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.size = new_size;
        self.configure_surface();
    }

    /// Paints every node in creation order over a dark background.
    pub fn render(&mut self, scene: &SceneNodes) -> Result<(), RendererError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost, reconfiguring");
                self.configure_surface();
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        };

        let texture_view = surface_texture.texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.surface_format.add_srgb_suffix()),
                ..Default::default()
            });

        let mut encoder = self.device.create_command_encoder(&Default::default());

        {
            let mut renderpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            renderpass.set_pipeline(&self.render_pipeline);
            self.render_nodes(&mut renderpass, scene);
        }

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        surface_texture.present();
        Ok(())
    }

    fn render_nodes(&self, renderpass: &mut wgpu::RenderPass<'_>, scene: &SceneNodes) {
        // TODO batch nodes into one vertex buffer instead of a buffer pair per node
        scene.iter().for_each(|(_, node)| {
            let uniform = Uniforms { color: sprite_color(&node.sprite) };

            let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let node_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Node Bind Group"),
                layout: &self.uniform_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

            let (vertices, indices) = create_ndc_node_quad_vertices(&node.transform, self.container_size);

            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            renderpass.set_bind_group(0, &node_bind_group, &[]);
            renderpass.set_vertex_buffer(0, vertex_buffer.slice(..));
            renderpass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            renderpass.draw_indexed(0..indices.len() as u32, 0, 0..1);
        });
    }
}

#[test]
fn test_full_container_node_covers_ndc() {
    let container = Vector2F::new(200.0, 100.0);
    let transform = NodeTransform {
        top_left: Vector2F::zero(),
        size: container,
        rotation: 0.0,
    };
    let (vertices, indices) = create_ndc_node_quad_vertices(&transform, container);
    assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
    assert_eq!(vertices[0], Vertex::from_position(-1.0, -1.0));
    assert_eq!(vertices[1], Vertex::from_position(1.0, -1.0));
    assert_eq!(vertices[2], Vertex::from_position(1.0, 1.0));
    assert_eq!(vertices[3], Vertex::from_position(-1.0, 1.0));
}

#[test]
fn test_half_turn_swaps_corners() {
    let container = Vector2F::new(100.0, 100.0);
    let transform = NodeTransform {
        top_left: Vector2F::new(25.0, 25.0),
        size: Vector2F::new(50.0, 50.0),
        rotation: 180.0,
    };
    let (vertices, _) = create_ndc_node_quad_vertices(&transform, container);
    // bottom-left ends up where top-right was
    assert!((vertices[0]._pos[0] - 0.5).abs() < 1e-5);
    assert!((vertices[0]._pos[1] - 0.5).abs() < 1e-5);
}

#[test]
fn test_sprite_color_is_stable_and_opaque() {
    let a = sprite_color("coin.png");
    assert_eq!(a, sprite_color("coin.png"));
    assert_ne!(a, sprite_color("player.png"));
    assert_eq!(a[3], 1.0);
    assert!(a[..3].iter().all(|c| (0.25..=1.0).contains(c)));
}
