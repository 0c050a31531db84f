/// Tests for DeviceManager
///
/// Drives acquire / record / submit / present against the mock device and
/// checks fence discipline and semaphore chaining.

use super::*;
use crate::device::mock_device::{MockDevice, MockCall};
use crate::device::{Extent2D, Submission};
use crate::error::Error;
use crate::settings::EngineSettings;

struct Fixture {
    mock: Arc<MockDevice>,
    table: PassTable,
    manager: DeviceManager,
}

fn fixture(settings: EngineSettings) -> Fixture {
    let (mock, device) = MockDevice::shared(3, Extent2D::new(800, 600));
    let table = PassTable::build(&device, &settings, 0, device.swapchain_info().format).unwrap();
    let manager = DeviceManager::new(device, &table, settings.frames_in_flight).unwrap();
    Fixture { mock, table, manager }
}

fn record(f: &mut Fixture, kind: PassKind, index: BufferIndex) {
    let cb = f.manager.create_or_get_command_buffer(index).unwrap();
    f.manager.begin_pass(kind, cb).unwrap();
    f.manager.end_pass(kind).unwrap();
    f.manager.submit(&f.table, kind, index).unwrap();
}

/// One complete frame: shadow + main
fn frame(f: &mut Fixture) -> Result<PresentOutcome> {
    let image = f.manager.acquire_next_image(&f.table)?;
    f.manager.reallocate_command_buffers()?;
    record(f, PassKind::ShadowDirect, BufferIndex::shadow_direct(0)?);
    record(f, PassKind::Main, BufferIndex::main(image)?);
    f.manager.present()
}

fn submissions(mock: &MockDevice) -> Vec<Submission> {
    mock.submissions()
}

// ============================================================================
// Tests: Frame loop
// ============================================================================

#[test]
fn test_single_frame() {
    let mut f = fixture(EngineSettings::default());
    assert_eq!(frame(&mut f).unwrap(), PresentOutcome::Presented);

    let subs = submissions(&f.mock);
    assert_eq!(subs.len(), 2);
    assert_eq!(f.manager.chain().submitted_order(), &[PassKind::ShadowDirect, PassKind::Main]);

    let presents = f.mock.presents();
    assert_eq!(presents.len(), 1);
    assert_eq!(presents[0].1, vec![subs[1].signal]);
    assert_eq!(f.manager.frame_id(), 1);
}

#[test]
fn test_many_frames_never_block() {
    let mut f = fixture(EngineSettings::default());
    for _ in 0..10 {
        frame(&mut f).unwrap();
    }
    assert_eq!(f.manager.frame_id(), 10);
}

#[test]
fn test_fence_waited_before_each_frame_and_reset_before_terminal_submit() {
    let mut f = fixture(EngineSettings::default());
    f.mock.clear_calls();
    frame(&mut f).unwrap();

    let calls = f.mock.calls();
    let wait = calls.iter().position(|c| matches!(c, MockCall::WaitFence(_))).unwrap();
    let acquire = calls.iter().position(|c| matches!(c, MockCall::Acquire { .. })).unwrap();
    let reset = calls.iter().position(|c| matches!(c, MockCall::ResetFence(_))).unwrap();
    let last_submit = calls.iter().rposition(|c| matches!(c, MockCall::Submit(_))).unwrap();
    let first_submit = calls.iter().position(|c| matches!(c, MockCall::Submit(_))).unwrap();

    assert!(wait < acquire);
    assert!(first_submit < reset);
    assert_eq!(reset + 1, last_submit);
}

#[test]
fn test_slot_fences_rotate() {
    let mut f = fixture(EngineSettings::default());
    let mut fences = Vec::new();
    for _ in 0..4 {
        frame(&mut f).unwrap();
        fences.push(submissions(&f.mock).last().unwrap().fence.unwrap());
    }
    assert_ne!(fences[0], fences[1]);
    assert_ne!(fences[1], fences[2]);
    assert_eq!(fences[0], fences[3]);
}

#[test]
fn test_first_submission_waits_on_image_available() {
    let mut f = fixture(EngineSettings::default());
    f.mock.clear_calls();
    frame(&mut f).unwrap();
    let acquire_signal = f
        .mock
        .calls()
        .iter()
        .find_map(|c| match c {
            MockCall::Acquire { signal, .. } => Some(*signal),
            _ => None,
        })
        .unwrap();
    assert_eq!(submissions(&f.mock)[0].wait, Some(acquire_signal));
}

// ============================================================================
// Tests: Errors
// ============================================================================

#[test]
fn test_out_of_date_acquire_passes_through() {
    let mut f = fixture(EngineSettings::default());
    f.mock.push_acquire_result(Err(Error::SwapchainOutOfDate));
    let result = f.manager.acquire_next_image(&f.table);
    assert_eq!(result, Err(Error::SwapchainOutOfDate));

    // The fence was never reset: the next frame does not deadlock
    assert!(frame(&mut f).is_ok());
}

#[test]
fn test_aborted_frame_does_not_deadlock() {
    let mut f = fixture(EngineSettings::default());
    f.manager.acquire_next_image(&f.table).unwrap();
    f.manager.reallocate_command_buffers().unwrap();
    record(&mut f, PassKind::ShadowDirect, BufferIndex::shadow_direct(0).unwrap());
    // Abandoned before the terminal submission: slot fence still signaled
    assert!(f.manager.frame_sync().wait_current().is_ok());
}

#[test]
fn test_submit_with_wrong_buffer_index_rejected() {
    let mut f = fixture(EngineSettings::default());
    let image = f.manager.acquire_next_image(&f.table).unwrap();
    f.manager.reallocate_command_buffers().unwrap();
    let cb = f.manager.create_or_get_command_buffer(BufferIndex::main(image).unwrap()).unwrap();
    f.manager.begin_pass(PassKind::Main, cb).unwrap();
    f.manager.end_pass(PassKind::Main).unwrap();
    let result = f.manager.submit(&f.table, PassKind::Main, BufferIndex::water_reflection());
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_present_without_main_rejected() {
    let mut f = fixture(EngineSettings::default());
    f.manager.acquire_next_image(&f.table).unwrap();
    assert!(matches!(f.manager.present(), Err(Error::InvalidState(_))));
}

#[test]
fn test_out_of_date_present_still_advances() {
    let mut f = fixture(EngineSettings::default());
    f.mock.push_present_result(Err(Error::SwapchainOutOfDate));
    assert_eq!(frame(&mut f), Err(Error::SwapchainOutOfDate));
    assert_eq!(f.manager.frame_id(), 1);
    assert!(frame(&mut f).is_ok());
}

#[test]
fn test_suboptimal_acquire_reported_at_present() {
    let mut f = fixture(EngineSettings::default());
    f.mock.push_acquire_result(Ok(crate::device::AcquiredImage { index: 0, suboptimal: true }));
    assert_eq!(frame(&mut f).unwrap(), PresentOutcome::Suboptimal);
}

// ============================================================================
// Tests: Resize
// ============================================================================

#[test]
fn test_resize_waits_idle_and_resets_pools() {
    let mut f = fixture(EngineSettings::default());
    frame(&mut f).unwrap();
    f.mock.clear_calls();

    let info = f.manager.resize(1024, 768, &f.table).unwrap();
    assert_eq!(info.extent, Extent2D::new(1024, 768));
    assert_eq!(f.manager.swapchain().extent, Extent2D::new(1024, 768));

    let calls = f.mock.calls();
    assert!(matches!(calls[0], MockCall::WaitIdle));
    assert!(matches!(calls[1], MockCall::RecreateSwapchain(_)));
    let resets = calls.iter().filter(|c| matches!(c, MockCall::ResetCommandPool(_))).count();
    assert_eq!(resets, f.manager.pool_count());

    assert!(frame(&mut f).is_ok());
    assert!(f.mock.stale_uses().is_empty());
}
