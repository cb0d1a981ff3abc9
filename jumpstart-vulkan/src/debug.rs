use std::borrow::Cow;
use std::ffi::{CStr, c_void};
use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartResult, ScopedHandle};
use log::{info, warn};

use crate::library::LibraryState;
use crate::loader::vk_error;

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = unsafe { *p_callback_data };
    let message_id_number = callback_data.message_id_number;

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy() }
    };

    let message = if callback_data.p_message.is_null() {
        Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    log::log!(
        severity_level(message_severity),
        "[Vulkan] {:?} [{} ({})]: {}",
        message_type,
        message_id_name,
        message_id_number,
        message
    );

    vk::FALSE
}

fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => log::Level::Debug,
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::Level::Info,
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::Level::Warn,
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::Level::Error,
        _ => log::Level::Info,
    }
}

pub(crate) fn debug_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        pfn_user_callback: Some(vulkan_debug_callback),
        ..Default::default()
    }
}

impl LibraryState {
    /// Installs a messenger forwarding validation output to `log`. Leaves `target`
    /// untouched when validation is off.
    pub fn create_debug_messenger(
        &self,
        instance: vk::Instance,
        target: &mut ScopedHandle<'_, vk::DebugUtilsMessengerEXT>,
    ) -> JumpstartResult<()> {
        if !self.config().validation {
            return Ok(());
        }

        let create_messenger = self.entry_points()?.create_debug_utils_messenger_ext()?;
        let create_info = debug_messenger_create_info();

        let slot = target.replace();
        let result = unsafe { create_messenger(instance, &create_info, ptr::null(), slot) };
        if result != vk::Result::SUCCESS {
            warn!("Failed to create debug messenger: {:?}", result);
            return Err(vk_error("vkCreateDebugUtilsMessengerEXT")(result));
        }

        info!("Debug messenger installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LibraryConfig;

    #[test]
    fn severity_maps_to_log_level() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;
        assert_eq!(severity_level(Severity::VERBOSE), log::Level::Debug);
        assert_eq!(severity_level(Severity::INFO), log::Level::Info);
        assert_eq!(severity_level(Severity::WARNING), log::Level::Warn);
        assert_eq!(severity_level(Severity::ERROR), log::Level::Error);
    }

    #[test]
    fn callback_tolerates_missing_strings() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();
        let result = unsafe {
            vulkan_debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn messenger_is_skipped_without_validation() {
        let state = LibraryState::new(LibraryConfig {
            validation: false,
            ..LibraryConfig::default()
        });
        let mut messenger = ScopedHandle::new(|_: vk::DebugUtilsMessengerEXT| {});
        state
            .create_debug_messenger(vk::Instance::null(), &mut messenger)
            .unwrap();
        assert!(messenger.is_null());
    }
}
