/// Vulkan debug messenger - routes validation layer messages into the engine log
///
/// Compiled only with the `vulkan-validation` feature. Messages are forwarded
/// to the active `Logger` under the `strata::vulkan::validation` source and
/// counted per severity; repeated messages are counted once per message id.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use strata_engine::strata::{Error, Result};

use crate::vulkan_format::lock;

const SOURCE: &str = "strata::vulkan::validation";

/// Global validation statistics (atomic counters)
static STATS: StatsTracker = StatsTracker::new();

/// Occurrence count per message id
static REPEATS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts since the last device creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct StatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl StatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn counter(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> &AtomicU32 {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        }
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [&self.errors, &self.warnings, &self.info, &self.verbose] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    STATS.snapshot()
}

/// Print a colored summary of the validation messages seen so far
pub fn print_validation_stats_report() {
    let stats = validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Some(repeats) = lock(&REPEATS).as_ref() {
        let repeated = repeats.values().filter(|&&count| count > 1).count();
        if repeated > 0 {
            println!("  {} message id(s) appeared multiple times", repeated);
        }
    }
    println!("{}\n", "====================================".bright_blue().bold());
}

/// Count one occurrence of `message_id`, returning the running count
fn track_repeat(message_id: &str) -> u32 {
    let mut guard = lock(&REPEATS);
    let repeats = guard.get_or_insert_with(FxHashMap::default);
    let count = repeats.entry(message_id.to_string()).or_insert(0);
    *count += 1;
    *count
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Vulkan debug messenger callback
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = if callback_data.p_message_id_name.is_null() {
        "Unknown".into()
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };
    let message = if callback_data.p_message.is_null() {
        "No message".into()
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    STATS.counter(message_severity).fetch_add(1, Ordering::Relaxed);
    let occurrences = track_repeat(&message_id);
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };
    let kind = message_type_name(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        strata_engine::engine_error!(SOURCE, "[{}]{} {}: {}", kind, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        strata_engine::engine_warn!(SOURCE, "[{}]{} {}: {}", kind, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        strata_engine::engine_debug!(SOURCE, "[{}]{} {}: {}", kind, repeat, message_id, message);
    } else {
        strata_engine::engine_trace!(SOURCE, "[{}]{} {}: {}", kind, repeat, message_id, message);
    }

    vk::FALSE
}

/// Debug utils loader and the messenger it created
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Instance extension the messenger needs
    pub(crate) const EXTENSION: &'static CStr = ash::ext::debug_utils::NAME;

    /// Validation layer enabled alongside the messenger
    pub(crate) const LAYER: &'static CStr = c"VK_LAYER_KHRONOS_validation";

    pub(crate) fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        STATS.reset();
        *lock(&REPEATS) = Some(FxHashMap::default());

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }
            .map_err(|e| {
                strata_engine::engine_error!(crate::vulkan_format::SOURCE,
                    "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger. Must run before the instance is destroyed.
    pub(crate) unsafe fn destroy(&self) {
        self.loader.destroy_debug_utils_messenger(self.messenger, None);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
