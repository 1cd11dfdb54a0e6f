//! Dynamic rendering helpers (Vulkan 1.3).
//!
//! This module provides utilities for setting up dynamic rendering without
//! using traditional VkRenderPass objects. Only color attachments are
//! supported; the clear happens through the attachment load op.
//!
//! # Overview
//!
//! - [`ColorAttachment`] - Configuration for a color attachment
//! - [`RenderingConfig`] - Complete rendering configuration
//! - [`RenderingInfoBundle`] - Built attachment arrays with proper lifetimes
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use triangle_rhi::rendering::{ColorAttachment, RenderingConfig};
//! use triangle_rhi::command::CommandRecorder;
//!
//! # fn example(
//! #     swapchain_image_view: vk::ImageView,
//! #     recorder: &CommandRecorder,
//! # ) -> Result<(), triangle_rhi::RhiError> {
//! let color_attachment = ColorAttachment::new(swapchain_image_view)
//!     .with_clear_color([0.1, 0.1, 0.1, 1.0]);
//!
//! let config = RenderingConfig::new(800, 600).with_color_attachment(color_attachment);
//!
//! // Build rendering info bundle with proper lifetime management
//! let bundle = config.build();
//! let info = bundle.info();
//! recorder.begin_rendering(&info)?;
//! // ... draw commands ...
//! recorder.end_rendering()?;
//! # Ok(())
//! # }
//! ```

use ash::vk;

/// Configuration for a color attachment in dynamic rendering.
///
/// This struct wraps the configuration needed to create a
/// `VkRenderingAttachmentInfo` for a color attachment.
///
/// # Default Values
///
/// - `layout`: `COLOR_ATTACHMENT_OPTIMAL`
/// - `load_op`: `CLEAR`
/// - `store_op`: `STORE`
/// - `clear_value`: Black (0.0, 0.0, 0.0, 1.0)
#[derive(Clone)]
pub struct ColorAttachment {
    /// The image view to render to.
    pub image_view: vk::ImageView,
    /// The image layout during rendering.
    pub layout: vk::ImageLayout,
    /// How to load the attachment contents at the start of rendering.
    pub load_op: vk::AttachmentLoadOp,
    /// How to store the attachment contents at the end of rendering.
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value when load_op is CLEAR.
    pub clear_value: vk::ClearColorValue,
}

impl ColorAttachment {
    /// Creates a new color attachment with default settings.
    ///
    /// # Arguments
    ///
    /// * `image_view` - The image view to render to
    #[inline]
    pub fn new(image_view: vk::ImageView) -> Self {
        Self {
            image_view,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }
    }

    /// Sets the image layout for this attachment.
    #[inline]
    pub fn with_layout(mut self, layout: vk::ImageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the load operation for this attachment.
    #[inline]
    pub fn with_load_op(mut self, load_op: vk::AttachmentLoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Sets the store operation for this attachment.
    #[inline]
    pub fn with_store_op(mut self, store_op: vk::AttachmentStoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    /// Sets the clear color as RGBA float values.
    ///
    /// # Arguments
    ///
    /// * `color` - Clear color as [R, G, B, A] floats in range [0.0, 1.0]
    #[inline]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_value = vk::ClearColorValue { float32: color };
        self
    }

    /// Configures this attachment to load existing contents.
    ///
    /// Sets `load_op` to `LOAD`, which preserves existing image contents.
    #[inline]
    pub fn load(mut self) -> Self {
        self.load_op = vk::AttachmentLoadOp::LOAD;
        self
    }

    /// Converts this attachment to a `VkRenderingAttachmentInfo`.
    #[inline]
    pub fn to_rendering_attachment_info(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                color: self.clear_value,
            })
    }
}

impl std::fmt::Debug for ColorAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // ClearColorValue is a union, so we format the float32 variant by default
        let clear_color = unsafe { self.clear_value.float32 };
        f.debug_struct("ColorAttachment")
            .field("image_view", &self.image_view)
            .field("layout", &self.layout)
            .field("load_op", &self.load_op)
            .field("store_op", &self.store_op)
            .field("clear_value", &clear_color)
            .finish()
    }
}

impl Default for ColorAttachment {
    /// Creates a default color attachment with null image view.
    ///
    /// Note: You must set a valid `image_view` before use.
    fn default() -> Self {
        Self::new(vk::ImageView::null())
    }
}

/// Complete rendering configuration for dynamic rendering.
///
/// This struct holds the information needed to construct a `VkRenderingInfo`
/// for use with `vkCmdBeginRendering`.
#[derive(Clone, Debug, Default)]
pub struct RenderingConfig {
    /// Color attachments for this rendering operation.
    pub color_attachments: Vec<ColorAttachment>,
    /// Render area (region to render to).
    pub render_area: vk::Rect2D,
    /// Number of layers to render.
    pub layer_count: u32,
}

impl RenderingConfig {
    /// Creates a new rendering configuration with the specified dimensions.
    ///
    /// # Arguments
    ///
    /// * `width` - Render area width in pixels
    /// * `height` - Render area height in pixels
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color_attachments: Vec::new(),
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width, height },
            },
            layer_count: 1,
        }
    }

    /// Creates a new rendering configuration from an extent.
    #[inline]
    pub fn from_extent(extent: vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }

    /// Adds a color attachment to this configuration.
    #[inline]
    pub fn with_color_attachment(mut self, attachment: ColorAttachment) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    /// Returns the render area extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.render_area.extent
    }

    /// Returns the width of the render area.
    #[inline]
    pub fn width(&self) -> u32 {
        self.render_area.extent.width
    }

    /// Returns the height of the render area.
    #[inline]
    pub fn height(&self) -> u32 {
        self.render_area.extent.height
    }

    /// Builds the complete `VkRenderingInfo` with proper lifetimes.
    ///
    /// # Returns
    ///
    /// A `RenderingInfoBundle` that contains all necessary data with proper lifetimes.
    pub fn build(&self) -> RenderingInfoBundle {
        RenderingInfoBundle::new(self)
    }
}

/// A bundle containing `VkRenderingInfo` and its backing data.
///
/// This struct ensures that the attachment info array outlives the
/// `VkRenderingInfo` that references it.
pub struct RenderingInfoBundle {
    color_attachments: Vec<vk::RenderingAttachmentInfo<'static>>,
    render_area: vk::Rect2D,
    layer_count: u32,
}

impl RenderingInfoBundle {
    /// Creates a new bundle from a rendering configuration.
    pub fn new(config: &RenderingConfig) -> Self {
        let color_attachments: Vec<vk::RenderingAttachmentInfo> = config
            .color_attachments
            .iter()
            .map(|a| a.to_rendering_attachment_info())
            .collect();

        Self {
            color_attachments,
            render_area: config.render_area,
            layer_count: config.layer_count,
        }
    }

    /// Returns the `VkRenderingInfo` referencing this bundle's data.
    ///
    /// The returned reference is valid as long as this bundle exists.
    pub fn info(&self) -> vk::RenderingInfo<'_> {
        vk::RenderingInfo::default()
            .render_area(self.render_area)
            .layer_count(self.layer_count)
            .color_attachments(&self.color_attachments)
    }

    /// Returns the color attachments.
    #[inline]
    pub fn color_attachments(&self) -> &[vk::RenderingAttachmentInfo<'static>] {
        &self.color_attachments
    }

    /// Returns the render area.
    #[inline]
    pub fn render_area(&self) -> vk::Rect2D {
        self.render_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_default() {
        let attachment = ColorAttachment::default();
        assert_eq!(attachment.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        // Check clear value is black
        let clear = unsafe { attachment.clear_value.float32 };
        assert_eq!(clear, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_color_attachment_builder() {
        let attachment = ColorAttachment::new(vk::ImageView::null())
            .with_clear_color([1.0, 0.0, 0.0, 1.0])
            .with_load_op(vk::AttachmentLoadOp::LOAD)
            .with_store_op(vk::AttachmentStoreOp::DONT_CARE);

        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::DONT_CARE);
        let clear = unsafe { attachment.clear_value.float32 };
        assert_eq!(clear, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_color_attachment_load_helper() {
        let attachment = ColorAttachment::new(vk::ImageView::null()).load();
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::LOAD);
    }

    #[test]
    fn test_rendering_config_new() {
        let config = RenderingConfig::new(1920, 1080);
        assert_eq!(config.render_area.extent.width, 1920);
        assert_eq!(config.render_area.extent.height, 1080);
        assert_eq!(config.render_area.offset.x, 0);
        assert_eq!(config.render_area.offset.y, 0);
        assert_eq!(config.layer_count, 1);
        assert!(config.color_attachments.is_empty());
    }

    #[test]
    fn test_rendering_config_from_extent() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let config = RenderingConfig::from_extent(extent);
        assert_eq!(config.width(), 800);
        assert_eq!(config.height(), 600);
    }

    #[test]
    fn test_rendering_info_bundle() {
        let color =
            ColorAttachment::new(vk::ImageView::null()).with_clear_color([0.1, 0.2, 0.3, 1.0]);

        let config = RenderingConfig::new(1920, 1080).with_color_attachment(color);

        let bundle = config.build();

        assert_eq!(bundle.color_attachments().len(), 1);
        assert_eq!(bundle.render_area().extent.width, 1920);
        assert_eq!(bundle.render_area().extent.height, 1080);
    }

    #[test]
    fn test_rendering_info_bundle_info_method() {
        let config = RenderingConfig::new(800, 600)
            .with_color_attachment(ColorAttachment::new(vk::ImageView::null()));

        let bundle = config.build();
        let info = bundle.info();

        assert_eq!(info.render_area.extent.width, 800);
        assert_eq!(info.render_area.extent.height, 600);
        assert_eq!(info.layer_count, 1);
    }

    #[test]
    fn test_color_attachment_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ColorAttachment>();
    }

    #[test]
    fn test_rendering_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderingConfig>();
    }
}
