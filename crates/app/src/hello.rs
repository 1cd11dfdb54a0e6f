//! The hello-triangle sample: one static colored triangle.

use std::path::Path;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use tracing::info;

use triangle_platform::InputState;
use triangle_renderer::{FrameTarget, InitContext, Sample};
use triangle_rhi::{RhiResult, vk};
use triangle_rhi::buffer::Buffer;
use triangle_rhi::command::CommandRecorder;
use triangle_rhi::device::Device;
use triangle_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use triangle_rhi::rendering::{ColorAttachment, RenderingConfig};
use triangle_rhi::shader::{Shader, ShaderStage};
use triangle_rhi::vertex::Vertex;

/// Background clear color.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.2, 0.4, 1.0];

/// GPU resources built during init.
struct TriangleGpu {
    /// Drop order: pipeline before its layout.
    pipeline: Pipeline,
    /// Held for its lifetime; the pipeline references it.
    _pipeline_layout: PipelineLayout,
    vertex_buffer: Buffer,
}

/// Draws a red/green/blue triangle, apex up, against a blue clear.
#[derive(Default)]
pub struct HelloTriangle {
    gpu: Option<TriangleGpu>,
}

impl HelloTriangle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sample for HelloTriangle {
    fn init(&mut self, ctx: &InitContext<'_>) -> RhiResult<()> {
        let (pipeline, pipeline_layout) = build_pipeline(ctx.device, ctx.color_format)?;
        let vertices = triangle_vertices(ctx.aspect_ratio());
        let vertex_buffer =
            Buffer::vertex_with_data(ctx.device.clone(), bytemuck::cast_slice(&vertices))?;

        info!(
            "Triangle resources created (aspect ratio {:.3})",
            ctx.aspect_ratio()
        );

        self.gpu = Some(TriangleGpu {
            pipeline,
            _pipeline_layout: pipeline_layout,
            vertex_buffer,
        });
        Ok(())
    }

    fn update(&mut self, _delta_secs: f32, _input: &mut InputState) {
        // The triangle is static.
    }

    fn record(&mut self, recorder: &CommandRecorder, target: &FrameTarget) -> RhiResult<()> {
        let Some(gpu) = &self.gpu else {
            // init() has not run; nothing to draw.
            return Ok(());
        };

        let attachment = ColorAttachment::new(target.view).with_clear_color(CLEAR_COLOR);
        let config =
            RenderingConfig::from_extent(target.extent).with_color_attachment(attachment);
        let bundle = config.build();

        recorder.begin_rendering(&bundle.info())?;

        recorder.set_viewport(&full_viewport(target.extent))?;
        recorder.set_scissor(&bundle.render_area())?;

        recorder.bind_pipeline(gpu.pipeline.handle())?;
        recorder.bind_vertex_buffer(gpu.vertex_buffer.handle(), 0)?;
        recorder.draw(3, 1, 0, 0)?;

        recorder.end_rendering()?;
        Ok(())
    }
}

/// Builds the one triangle pipeline: the SPIR-V pair, an empty layout, and
/// the fixed vertex format.
fn build_pipeline(
    device: &Arc<Device>,
    color_format: vk::Format,
) -> RhiResult<(Pipeline, PipelineLayout)> {
    let vertex_shader = Shader::from_spirv_file(
        device.clone(),
        Path::new("shaders/spirv/triangle.vert.spv"),
        ShaderStage::Vertex,
        "main",
    )?;
    let fragment_shader = Shader::from_spirv_file(
        device.clone(),
        Path::new("shaders/spirv/triangle.frag.spv"),
        ShaderStage::Fragment,
        "main",
    )?;

    let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[])?;

    let pipeline = GraphicsPipelineBuilder::new()
        .vertex_shader(&vertex_shader)
        .fragment_shader(&fragment_shader)
        .vertex_binding(Vertex::binding_description())
        .vertex_attributes(&Vertex::attribute_descriptions())
        .color_attachment_format(color_format)
        .cull_mode(CullMode::None)
        .build(device.clone(), &pipeline_layout)?;

    Ok((pipeline, pipeline_layout))
}

/// Viewport covering the whole render target with the standard depth range.
fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// The triangle's three vertices, scaled by the window aspect ratio.
///
/// Positions are in Vulkan clip space (+Y down), so the apex carries the
/// negative Y offset and renders at the top.
fn triangle_vertices(aspect_ratio: f32) -> [Vertex; 3] {
    [
        Vertex::new(
            Vec3::new(0.0, -0.25 * aspect_ratio, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        ),
        Vertex::new(
            Vec3::new(0.25, 0.25 * aspect_ratio, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        ),
        Vertex::new(
            Vec3::new(-0.25, 0.25 * aspect_ratio, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apex_is_up_in_clip_space() {
        let [apex, right, left] = triangle_vertices(16.0 / 9.0);
        // +Y is down in Vulkan clip space.
        assert!(apex.position[1] < 0.0);
        assert!(right.position[1] > 0.0);
        assert!(left.position[1] > 0.0);
        assert!(right.position[0] > 0.0);
        assert!(left.position[0] < 0.0);
    }

    #[test]
    fn test_vertices_scale_with_aspect_ratio() {
        let wide = triangle_vertices(2.0);
        let square = triangle_vertices(1.0);
        assert_eq!(wide[0].position[1], 2.0 * square[0].position[1]);
        // X offsets are fixed.
        assert_eq!(wide[1].position[0], square[1].position[0]);
    }

    #[test]
    fn test_full_viewport_covers_target() {
        let viewport = full_viewport(vk::Extent2D {
            width: 1280,
            height: 720,
        });
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
        assert_eq!((viewport.width, viewport.height), (1280.0, 720.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
    }

    #[test]
    fn test_vertex_colors_are_rgb() {
        let [a, b, c] = triangle_vertices(1.0);
        assert_eq!(a.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(b.color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(c.color, [0.0, 0.0, 1.0, 1.0]);
    }
}
