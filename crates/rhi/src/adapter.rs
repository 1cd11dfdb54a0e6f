//! Adapter (GPU) enumeration and selection.
//!
//! This module picks the physical device the rest of the crate renders with.
//!
//! # Overview
//!
//! Selection runs in two phases:
//! 1. Every enumerated device is probed for hard requirements (graphics and
//!    present queue families, Vulkan 1.3, swapchain support on the target
//!    surface). Probing only reads descriptors; no device objects are kept.
//! 2. The surviving candidates are filtered and ranked by [`AdapterCriteria`]
//!    and the best one is returned.
//!
//! Software rasterizers (device type `CPU`, e.g. lavapipe/SwiftShader) are
//! rejected unless the caller opts in. When they are admitted they outrank
//! every hardware adapter, so an explicit software request always lands on one.
//!
//! # Example
//!
//! ```no_run
//! use triangle_rhi::adapter::{select_adapter, AdapterCriteria};
//! use triangle_rhi::instance::Instance;
//! use ash::vk;
//!
//! # fn example(instance: &Instance, surface: vk::SurfaceKHR) {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let adapter = select_adapter(
//!     instance.handle(),
//!     surface,
//!     &surface_loader,
//!     AdapterCriteria::default(),
//! )
//! .expect("Failed to select adapter");
//!
//! println!("Selected adapter: {}", adapter.name());
//! # }
//! ```

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Score given to an admitted software adapter. Class weights and memory
/// bonuses for hardware adapters stay well below this.
const SOFTWARE_ADAPTER_SCORE: u32 = 1_000_000;

/// Selection policy for [`select_adapter`].
#[derive(Clone, Copy, Debug)]
pub struct AdapterCriteria {
    /// Rank hardware adapters by device class and memory. When false, eligible
    /// adapters keep their enumeration order and the first one wins.
    pub prefer_high_performance: bool,
    /// Admit software (CPU) adapters. An admitted software adapter outranks
    /// all hardware adapters.
    pub allow_software: bool,
}

impl Default for AdapterCriteria {
    fn default() -> Self {
        Self {
            prefer_high_performance: true,
            allow_software: false,
        }
    }
}

/// Queue family indices required for rendering and presentation.
///
/// Vulkan devices expose multiple queue families with different capabilities;
/// this crate only needs one family with graphics support and one able to
/// present to the target surface (often the same family).
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to a surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Checks if the required queue families are available.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Returns the unique queue family indices as a vector.
    ///
    /// This is useful when creating logical devices to avoid creating
    /// duplicate queues for the same family.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// Descriptor of an enumerated adapter.
///
/// Holds everything logical-device creation needs: the physical device handle,
/// its properties and memory layout, and the queue families found for it.
#[derive(Clone)]
pub struct AdapterProfile {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, ids, limits, API version).
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory properties (heap sizes, memory types).
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue family indices for graphics and present.
    pub queue_families: QueueFamilyIndices,
}

impl AdapterProfile {
    /// Returns the adapter name as a string.
    pub fn name(&self) -> &str {
        // SAFETY: Vulkan guarantees device_name is a null-terminated string.
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Adapter")
        }
    }

    /// Returns the PCI vendor id.
    #[inline]
    pub fn vendor_id(&self) -> u32 {
        self.properties.vendor_id
    }

    /// Returns the vendor-assigned device id.
    #[inline]
    pub fn device_id(&self) -> u32 {
        self.properties.device_id
    }

    /// Returns the device type (Discrete, Integrated, etc.).
    #[inline]
    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.properties.device_type
    }

    /// Returns true for software rasterizers (device type `CPU`).
    #[inline]
    pub fn is_software(&self) -> bool {
        self.properties.device_type == vk::PhysicalDeviceType::CPU
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "Software",
            _ => "Other",
        }
    }

    /// Returns the Vulkan API version supported by the adapter.
    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }

    /// Returns the total device local memory in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for AdapterProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("AdapterProfile")
            .field("name", &self.name())
            .field("type", &self.device_type_name())
            .field("vendor_id", &format_args!("{:#06x}", self.vendor_id()))
            .field("device_id", &format_args!("{:#06x}", self.device_id()))
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the adapter to render with.
///
/// Enumerates all physical devices, probes each one for the hard requirements
/// (queue families, Vulkan 1.3, swapchain support on `surface`) and picks the
/// best remaining candidate according to `criteria`.
///
/// # Arguments
///
/// * `instance` - The Vulkan instance
/// * `surface` - The window surface for present support checking
/// * `surface_loader` - The surface extension loader
/// * `criteria` - Ranking and software-adapter policy
///
/// # Errors
///
/// Returns [`RhiError::NoCompatibleAdapter`] if enumeration exhausts without
/// an acceptable candidate.
///
/// # Example
///
/// ```no_run
/// use triangle_rhi::adapter::{select_adapter, AdapterCriteria};
/// use triangle_rhi::instance::Instance;
/// use ash::vk;
///
/// # fn example(instance: &Instance, surface: vk::SurfaceKHR) {
/// let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
///
/// let criteria = AdapterCriteria {
///     allow_software: true,
///     ..Default::default()
/// };
/// let adapter = select_adapter(instance.handle(), surface, &surface_loader, criteria)
///     .expect("No compatible adapter found");
/// # }
/// ```
pub fn select_adapter(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
    criteria: AdapterCriteria,
) -> Result<AdapterProfile, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable adapters found");
        return Err(RhiError::NoCompatibleAdapter);
    }

    info!("Found {} adapter(s)", devices.len());

    let mut candidates = Vec::with_capacity(devices.len());
    for device in devices {
        if let Some(profile) = probe_adapter(instance, device, surface, surface_loader) {
            candidates.push(profile);
        }
    }

    let selected = choose_adapter(candidates, criteria)?;

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected adapter: '{}' ({}) - Vulkan {}.{}.{}",
        selected.name(),
        selected.device_type_name(),
        major,
        minor,
        patch
    );

    Ok(selected)
}

/// Probes a physical device against the hard requirements.
///
/// Returns `Some(AdapterProfile)` if the device can drive this crate,
/// or `None` if it can't. Only descriptors are read; nothing is created.
fn probe_adapter(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<AdapterProfile> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    // SAFETY: Vulkan guarantees device_name is a null-terminated string.
    let name = unsafe {
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_str()
            .unwrap_or("Unknown")
    };

    let queue_families = find_queue_families(instance, device, surface, surface_loader);
    if !queue_families.is_complete() {
        debug!(
            "Adapter '{}' skipped: missing required queue families (graphics={}, present={})",
            name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return None;
    }

    // Vulkan 1.3 carries dynamic rendering, synchronization2 and timeline
    // semaphores in core.
    if !meets_minimum_api(properties.api_version) {
        debug!(
            "Adapter '{}' skipped: Vulkan 1.3 not supported (version: {}.{})",
            name,
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version)
        );
        return None;
    }

    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .unwrap_or_default()
    };
    if !supports_extension(&extensions, ash::khr::swapchain::NAME) {
        debug!("Adapter '{}' skipped: no swapchain extension", name);
        return None;
    }

    match SwapchainSupportDetails::query(device, surface, surface_loader) {
        Ok(support) if support.is_adequate() => {}
        Ok(_) => {
            debug!(
                "Adapter '{}' skipped: no usable surface formats or present modes",
                name
            );
            return None;
        }
        Err(e) => {
            debug!("Adapter '{}' skipped: surface query failed ({})", name, e);
            return None;
        }
    }

    Some(AdapterProfile {
        device,
        properties,
        memory_properties,
        queue_families,
    })
}

/// Applies the software-adapter policy and ranking to the probed candidates.
fn choose_adapter(
    candidates: Vec<AdapterProfile>,
    criteria: AdapterCriteria,
) -> Result<AdapterProfile, RhiError> {
    let mut ranked: Vec<(AdapterProfile, u32)> = Vec::with_capacity(candidates.len());

    for profile in candidates {
        if profile.is_software() && !criteria.allow_software {
            debug!(
                "Adapter '{}' skipped: software adapter not requested",
                profile.name()
            );
            continue;
        }

        let score = rate_adapter(&profile, criteria);
        debug!(
            "Adapter '{}' ({}) - Score: {}",
            profile.name(),
            profile.device_type_name(),
            score
        );
        ranked.push((profile, score));
    }

    if ranked.is_empty() {
        warn!("No adapter meets the device requirements");
        return Err(RhiError::NoCompatibleAdapter);
    }

    // Stable sort: equal scores keep enumeration order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked.remove(0).0)
}

/// Finds queue family indices for graphics and present.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i, surface)
                    .unwrap_or(false)
            };

            if present_support {
                indices.present_family = Some(i);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Rates an adapter under the given criteria. Higher scores win.
///
/// Class weights dominate the memory bonus, so a discrete GPU always outranks
/// an integrated one regardless of reported heap sizes.
fn rate_adapter(profile: &AdapterProfile, criteria: AdapterCriteria) -> u32 {
    if profile.is_software() {
        // Only reachable when software adapters are admitted.
        return SOFTWARE_ADAPTER_SCORE;
    }

    if !criteria.prefer_high_performance {
        // Unranked: enumeration order decides.
        return 0;
    }

    let mut score = match profile.device_type() {
        vk::PhysicalDeviceType::DISCRETE_GPU => 100_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 10_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1_000,
        _ => 10,
    };

    // Memory bonus in MB, capped below the gap between device classes.
    let vram_mb = (profile.device_local_memory() / (1024 * 1024)) as u32;
    score += vram_mb.min(8_000);

    score
}

/// Checks the Vulkan 1.3 floor.
fn meets_minimum_api(api_version: u32) -> bool {
    vk::api_version_major(api_version) > 1
        || (vk::api_version_major(api_version) == 1 && vk::api_version_minor(api_version) >= 3)
}

/// Checks whether a named extension appears in an enumerated extension list.
fn supports_extension(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available.iter().any(|ext| {
        // SAFETY: Vulkan guarantees extension_name is a null-terminated string.
        let ext_name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
        ext_name == name
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(device_type: vk::PhysicalDeviceType, vram_mb: u64) -> AdapterProfile {
        let properties = vk::PhysicalDeviceProperties {
            device_type,
            api_version: vk::API_VERSION_1_3,
            ..Default::default()
        };

        let mut memory_properties = vk::PhysicalDeviceMemoryProperties {
            memory_heap_count: 1,
            ..Default::default()
        };
        memory_properties.memory_heaps[0] = vk::MemoryHeap {
            size: vram_mb * 1024 * 1024,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };

        AdapterProfile {
            device: vk::PhysicalDevice::null(),
            properties,
            memory_properties,
            queue_families: QueueFamilyIndices {
                graphics_family: Some(0),
                present_family: Some(0),
            },
        }
    }

    fn extension_properties(name: &CStr) -> vk::ExtensionProperties {
        let mut ext = vk::ExtensionProperties::default();
        for (dst, &b) in ext.extension_name.iter_mut().zip(name.to_bytes_with_nul()) {
            *dst = b as std::ffi::c_char;
        }
        ext
    }

    #[test]
    fn test_queue_family_indices_complete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(indices.is_complete());

        assert!(!QueueFamilyIndices::default().is_complete());
        assert!(
            !QueueFamilyIndices {
                graphics_family: Some(0),
                present_family: None,
            }
            .is_complete()
        );
    }

    #[test]
    fn test_unique_families_shared_index() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn test_unique_families_distinct_indices() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        assert_eq!(indices.unique_families(), vec![0, 2]);
    }

    #[test]
    fn test_minimum_api_boundary() {
        assert!(!meets_minimum_api(vk::make_api_version(0, 1, 2, 189)));
        assert!(meets_minimum_api(vk::make_api_version(0, 1, 3, 0)));
        assert!(meets_minimum_api(vk::make_api_version(0, 1, 4, 0)));
        assert!(meets_minimum_api(vk::make_api_version(0, 2, 0, 0)));
    }

    #[test]
    fn test_extension_lookup() {
        let available = [
            extension_properties(c"VK_EXT_debug_marker"),
            extension_properties(ash::khr::swapchain::NAME),
        ];
        assert!(supports_extension(&available, ash::khr::swapchain::NAME));
        assert!(!supports_extension(
            &available,
            c"VK_KHR_acceleration_structure"
        ));
        assert!(!supports_extension(&[], ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_device_local_memory_ignores_host_heaps() {
        let mut p = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 4096);
        p.memory_properties.memory_heap_count = 2;
        p.memory_properties.memory_heaps[1] = vk::MemoryHeap {
            size: 16 * 1024 * 1024 * 1024,
            flags: vk::MemoryHeapFlags::empty(),
        };
        assert_eq!(p.device_local_memory(), 4096 * 1024 * 1024);
    }

    #[test]
    fn test_software_rejected_when_not_requested() {
        let criteria = AdapterCriteria {
            prefer_high_performance: true,
            allow_software: false,
        };
        let result = choose_adapter(vec![profile(vk::PhysicalDeviceType::CPU, 256)], criteria);
        assert!(matches!(result, Err(RhiError::NoCompatibleAdapter)));
    }

    #[test]
    fn test_software_selected_when_requested() {
        let criteria = AdapterCriteria {
            prefer_high_performance: true,
            allow_software: true,
        };
        let selected = choose_adapter(vec![profile(vk::PhysicalDeviceType::CPU, 256)], criteria)
            .expect("software adapter should be admitted");
        assert!(selected.is_software());
    }

    #[test]
    fn test_software_outranks_hardware_when_requested() {
        let criteria = AdapterCriteria {
            prefer_high_performance: true,
            allow_software: true,
        };
        let candidates = vec![
            profile(vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
            profile(vk::PhysicalDeviceType::CPU, 256),
        ];
        let selected = choose_adapter(candidates, criteria).expect("selection should succeed");
        assert!(selected.is_software());
    }

    #[test]
    fn test_discrete_outranks_integrated() {
        let criteria = AdapterCriteria::default();
        // Integrated adapters often report all of system RAM as device local;
        // the class weight must still win.
        let candidates = vec![
            profile(vk::PhysicalDeviceType::INTEGRATED_GPU, 32 * 1024),
            profile(vk::PhysicalDeviceType::DISCRETE_GPU, 2048),
        ];
        let selected = choose_adapter(candidates, criteria).expect("selection should succeed");
        assert_eq!(selected.device_type(), vk::PhysicalDeviceType::DISCRETE_GPU);
    }

    #[test]
    fn test_memory_breaks_class_ties() {
        let criteria = AdapterCriteria::default();
        let mut small = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 2048);
        small.properties.device_id = 1;
        let mut large = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 6144);
        large.properties.device_id = 2;

        let selected = choose_adapter(vec![small, large], criteria).expect("selection");
        assert_eq!(selected.device_id(), 2);
    }

    #[test]
    fn test_unranked_selection_keeps_enumeration_order() {
        let criteria = AdapterCriteria {
            prefer_high_performance: false,
            allow_software: false,
        };
        let mut first = profile(vk::PhysicalDeviceType::INTEGRATED_GPU, 1024);
        first.properties.device_id = 1;
        let mut second = profile(vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        second.properties.device_id = 2;

        let selected = choose_adapter(vec![first, second], criteria).expect("selection");
        assert_eq!(selected.device_id(), 1);
    }

    #[test]
    fn test_empty_candidate_list_is_error() {
        let result = choose_adapter(Vec::new(), AdapterCriteria::default());
        assert!(matches!(result, Err(RhiError::NoCompatibleAdapter)));
    }
}
