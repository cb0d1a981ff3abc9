use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartError, JumpstartResult, PlatformKind, ScopedHandle};
use libloading::Library;
use log::{debug, error, info, warn};

use crate::debug::debug_messenger_create_info;
use crate::loader::{EntryPointDiagnostic, EntryPoints, read_into_vec, vk_error};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

#[cfg(target_os = "windows")]
const MODULE_CANDIDATES: &[&str] = &["vulkan-1.dll"];
#[cfg(any(target_os = "macos", target_os = "ios"))]
const MODULE_CANDIDATES: &[&str] = &["libvulkan.dylib", "libvulkan.1.dylib", "libMoltenVK.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "ios")))]
const MODULE_CANDIDATES: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

#[derive(Clone, Debug)]
pub struct LibraryConfig {
    /// Decides which surface extension is required.
    pub platform: PlatformKind,
    /// Enables the validation layer and the debug-utils messenger.
    pub validation: bool,
    /// Loads this file instead of searching the default module names.
    pub library_path: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::native(),
            validation: cfg!(debug_assertions),
            library_path: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InstanceDescriptor<'a> {
    pub name: &'a str,
    pub api_version: u32,
}

impl<'a> InstanceDescriptor<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            api_version: vk::API_VERSION_1_0,
        }
    }
}

/// Instance extensions needed to present on `platform`.
pub fn required_instance_extensions(platform: PlatformKind, validation: bool) -> Vec<&'static CStr> {
    let mut extensions = vec![ash::khr::surface::NAME];
    match platform {
        PlatformKind::Win32 => extensions.push(ash::khr::win32_surface::NAME),
        PlatformKind::X11 => extensions.push(ash::khr::xlib_surface::NAME),
        PlatformKind::Headless => {}
    }
    if validation {
        extensions.push(ash::ext::debug_utils::NAME);
    }
    extensions
}

pub fn required_instance_layers(validation: bool) -> Vec<&'static CStr> {
    if validation { vec![VALIDATION_LAYER] } else { Vec::new() }
}

pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Names in `requested` that do not appear in `available`.
pub fn missing_layers(requested: &[&'static CStr], available: &[vk::LayerProperties]) -> Vec<&'static CStr> {
    requested
        .iter()
        .copied()
        .filter(|layer| {
            !available
                .iter()
                .any(|props| props.layer_name_as_c_str().is_ok_and(|name| name == *layer))
        })
        .collect()
}

struct LoadedLibrary {
    entry_points: EntryPoints,
    instance_extensions: Vec<&'static CStr>,
    instance_layers: Vec<&'static CStr>,
    device_extensions: Vec<&'static CStr>,
    path: PathBuf,
    // Declared last so every function pointer is gone before the module unloads.
    _module: Library,
}

/// Owns the loaded Vulkan module and everything resolved from it.
///
/// Nothing but `initialize` works before `initialize` succeeds; every other query
/// returns `NotInitialized`. Dropping the state tears it down.
pub struct LibraryState {
    config: LibraryConfig,
    loaded: Option<LoadedLibrary>,
}

impl LibraryState {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config, loaded: None }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn initialize(&mut self) -> JumpstartResult<()> {
        if self.loaded.is_some() {
            warn!("Vulkan library is already initialized");
            return Ok(());
        }

        let (module, path) = self.load_module()?;

        let entry_points = EntryPoints::new();
        entry_points.load_exported(&module);
        entry_points.load_global().map_err(|e| missing_entry_point(e, &path))?;
        ensure_global_functions(&entry_points).map_err(|e| missing_entry_point(e, &path))?;

        let instance_extensions = required_instance_extensions(self.config.platform, self.config.validation);
        let instance_layers = required_instance_layers(self.config.validation);
        let device_extensions = required_device_extensions();

        ensure_layers_available(&entry_points, &instance_layers)?;

        info!("Vulkan library loaded from {}", path.display());
        if let Ok(enumerate_version) = entry_points.enumerate_instance_version() {
            let mut version = 0;
            if unsafe { enumerate_version(&mut version) } == vk::Result::SUCCESS {
                info!(
                    "Vulkan instance version {}.{}.{}",
                    vk::api_version_major(version),
                    vk::api_version_minor(version),
                    vk::api_version_patch(version)
                );
            }
        }
        debug!("Required instance extensions: {:?}", instance_extensions);
        debug!("Required instance layers: {:?}", instance_layers);

        self.loaded = Some(LoadedLibrary {
            entry_points,
            instance_extensions,
            instance_layers,
            device_extensions,
            path,
            _module: module,
        });
        Ok(())
    }

    /// Unloads the module. Does nothing if the library was never initialized.
    pub fn teardown(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            let path = loaded.path.clone();
            drop(loaded);
            info!("Vulkan library unloaded ({})", path.display());
        }
    }

    fn load_module(&self) -> JumpstartResult<(Library, PathBuf)> {
        let candidates: Vec<PathBuf> = match &self.config.library_path {
            Some(path) => vec![path.clone()],
            None => MODULE_CANDIDATES.iter().map(PathBuf::from).collect(),
        };

        let mut failures = Vec::new();
        for candidate in candidates {
            match unsafe { Library::new(&candidate) } {
                Ok(module) => return Ok((module, candidate)),
                Err(e) => {
                    debug!("Could not load {}: {}", candidate.display(), e);
                    failures.push(format!("{}: {}", candidate.display(), e));
                }
            }
        }

        Err(JumpstartError::Initialization(format!(
            "Failed to load the Vulkan library ({})",
            failures.join("; ")
        )))
    }

    fn loaded(&self) -> JumpstartResult<&LoadedLibrary> {
        self.loaded.as_ref().ok_or(JumpstartError::NotInitialized)
    }

    pub fn entry_points(&self) -> JumpstartResult<&EntryPoints> {
        Ok(&self.loaded()?.entry_points)
    }

    /// Which file the module was loaded from.
    pub fn module_path(&self) -> JumpstartResult<&Path> {
        Ok(&self.loaded()?.path)
    }

    pub fn required_instance_extensions(&self) -> JumpstartResult<&[&'static CStr]> {
        Ok(&self.loaded()?.instance_extensions)
    }

    pub fn required_instance_layers(&self) -> JumpstartResult<&[&'static CStr]> {
        Ok(&self.loaded()?.instance_layers)
    }

    pub fn required_device_extensions(&self) -> JumpstartResult<&[&'static CStr]> {
        Ok(&self.loaded()?.device_extensions)
    }

    pub fn load_instance_entry_points(&self, instance: vk::Instance) -> JumpstartResult<Vec<EntryPointDiagnostic>> {
        self.entry_points()?.load_instance(instance)
    }

    pub fn load_device_entry_points(&self, device: vk::Device) -> JumpstartResult<Vec<EntryPointDiagnostic>> {
        self.entry_points()?.load_device(device)
    }

    /// Creates an instance with the required extensions and layers into `target`.
    ///
    /// With validation on, a debug messenger create info is chained in so messages
    /// emitted during instance creation are logged too.
    pub fn create_instance(
        &self,
        descriptor: &InstanceDescriptor<'_>,
        target: &mut ScopedHandle<'_, vk::Instance>,
    ) -> JumpstartResult<()> {
        let loaded = self.loaded()?;
        let create_instance = loaded.entry_points.create_instance()?;

        info!("Creating Vulkan instance for application: {}", descriptor.name);

        let app_name = CString::new(descriptor.name)
            .map_err(|_| JumpstartError::Initialization("application name contains a NUL byte".into()))?;
        let engine_name = c"Jumpstart";

        let app_info = vk::ApplicationInfo {
            p_application_name: app_name.as_ptr(),
            application_version: 0,
            p_engine_name: engine_name.as_ptr(),
            engine_version: 0,
            api_version: descriptor.api_version,
            ..Default::default()
        };

        let extension_names = as_ptrs(&loaded.instance_extensions);
        let layer_names = as_ptrs(&loaded.instance_layers);
        let debug_create_info = debug_messenger_create_info();

        let create_info = vk::InstanceCreateInfo {
            p_next: if self.config.validation {
                &debug_create_info as *const _ as *const std::ffi::c_void
            } else {
                ptr::null()
            },
            p_application_info: &app_info,
            pp_enabled_extension_names: extension_names.as_ptr(),
            enabled_extension_count: extension_names.len() as u32,
            pp_enabled_layer_names: layer_names.as_ptr(),
            enabled_layer_count: layer_names.len() as u32,
            ..Default::default()
        };

        let slot = target.replace();
        let result = unsafe { create_instance(&create_info, ptr::null(), slot) };
        if result != vk::Result::SUCCESS {
            error!("Instance creation error: {:?}", result);
            return Err(vk_error("vkCreateInstance")(result));
        }

        info!("Vulkan instance created successfully");
        Ok(())
    }
}

impl Drop for LibraryState {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn ensure_global_functions(entry_points: &EntryPoints) -> JumpstartResult<()> {
    entry_points.create_instance()?;
    entry_points.enumerate_instance_layer_properties()?;
    entry_points.enumerate_instance_extension_properties()?;
    Ok(())
}

fn ensure_layers_available(entry_points: &EntryPoints, requested: &[&'static CStr]) -> JumpstartResult<()> {
    if requested.is_empty() {
        return Ok(());
    }

    let enumerate = entry_points.enumerate_instance_layer_properties()?;
    let available = unsafe { read_into_vec(|count, data| enumerate(count, data)) }
        .map_err(vk_error("vkEnumerateInstanceLayerProperties"))?;
    match missing_layers(requested, &available).first() {
        Some(layer) => Err(JumpstartError::Initialization(format!(
            "Requested layer {} is not available",
            layer.to_string_lossy()
        ))),
        None => Ok(()),
    }
}

fn missing_entry_point(err: JumpstartError, path: &Path) -> JumpstartError {
    match err {
        JumpstartError::UnresolvedEntryPoint(name) => JumpstartError::Initialization(format!(
            "{} does not provide required entry point {}",
            path.display(),
            name
        )),
        other => other,
    }
}

pub(crate) fn as_ptrs(names: &[&'static CStr]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}
