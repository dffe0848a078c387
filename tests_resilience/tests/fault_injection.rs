//! Fault Injection Tests
//!
//! Volume faults surface as skipped volumes or as errors, and never leave a
//! handle open or a pool allocation behind.

use fs_view::FsError;
use hal::{FileError, ScriptedSelect};
use services_file_picker::{FilePicker, FilePickerError, PickerOutcome, PickerRequest};
use services_logger::LogLevel;
use services_storage::FailingVolumeSet;
use services_volume_selector::{SkipStage, VolumeEnumerator, VolumeError};
use tests_resilience::{assert_handles_closed, standard_volumes, FailurePolicy, TestSession};

fn request() -> PickerRequest {
    PickerRequest::new(["Select a file"])
}

/// Runs one session over the standard volumes wrapped in `policy`
fn run_with_policy(
    session: &TestSession,
    policy: impl FnOnce(&services_storage::MemoryVolumeSet) -> FailurePolicy,
    request: PickerRequest,
    answers: Vec<Option<usize>>,
) -> (
    Result<PickerOutcome, FilePickerError>,
    FailingVolumeSet<services_storage::MemoryVolumeSet>,
    ScriptedSelect,
) {
    let volumes = standard_volumes();
    let policy = policy(&volumes);
    let mut failing = FailingVolumeSet::new(volumes, policy);
    let mut console = ScriptedSelect::new(answers);
    let ctx = session.ctx();
    let result = FilePicker::new(&ctx, &mut failing, &mut console).run(&request);
    (result, failing, console)
}

/// Test: A volume without the protocol is left off the menu
#[test]
fn test_protocol_failure_skips_volume() {
    let session = TestSession::new();
    let (result, failing, console) = run_with_policy(
        &session,
        |volumes| FailurePolicy::HandleProtocolOn(vec![volumes.handles()[0]]),
        request(),
        vec![None],
    );

    assert!(result.unwrap().is_cancelled());
    assert_eq!(
        console.presented()[0].entries,
        vec!["PciRoot(0x0)/Pci(0x1,0x1)/Sata(0x0)"]
    );
    assert_eq!(session.sink.at_least(LogLevel::Warn).len(), 1);
    assert_eq!(failing.injected_failures(), 1);
    session.assert_balanced();
    assert_handles_closed(failing.inner().stats());
}

/// Test: Every skip stage is reported with its volume
#[test]
fn test_skip_stages_are_reported() {
    let cases: [(fn(Vec<hal::VolumeHandle>) -> FailurePolicy, SkipStage); 3] = [
        (FailurePolicy::HandleProtocolOn, SkipStage::Protocol),
        (FailurePolicy::OpenVolumeOn, SkipStage::OpenVolume),
        (FailurePolicy::FileSystemInfoOn, SkipStage::VolumeInfo),
    ];

    for (policy, stage) in cases {
        let session = TestSession::new();
        let volumes = standard_volumes();
        let data = volumes.handles()[1];
        let mut failing = FailingVolumeSet::new(volumes, policy(vec![data]));

        let enumeration = VolumeEnumerator::new(&session.ctx())
            .enumerate(&mut failing)
            .unwrap();
        assert_eq!(enumeration.names(), vec!["ESP"]);
        assert!(enumeration.is_incomplete());
        assert_eq!(enumeration.skipped().len(), 1);
        assert_eq!(enumeration.skipped()[0].handle, data);
        assert_eq!(enumeration.skipped()[0].stage, stage);

        drop(enumeration);
        session.assert_balanced();
        assert_handles_closed(failing.inner().stats());
    }
}

/// Test: No usable volume is an error, not an empty menu
#[test]
fn test_all_volumes_unusable() {
    let session = TestSession::new();
    let (result, failing, console) = run_with_policy(
        &session,
        |volumes| FailurePolicy::OpenVolumeOn(volumes.handles()),
        request(),
        vec![Some(0)],
    );

    assert_eq!(
        result.unwrap_err(),
        FilePickerError::Volume(VolumeError::NoUsableVolumes { located: 2 })
    );
    assert!(console.presented().is_empty());
    session.assert_balanced();
    assert_handles_closed(failing.inner().stats());
}

/// Test: A failing root open on a requested volume is a listing error
#[test]
fn test_open_volume_failure_on_requested_volume() {
    let session = TestSession::new();
    let esp = standard_volumes().handles()[0];
    let (result, failing, _) = run_with_policy(
        &session,
        |volumes| FailurePolicy::OpenVolumeOn(vec![volumes.handles()[0]]),
        request().with_volume(esp),
        vec![],
    );

    assert!(matches!(
        result.unwrap_err(),
        FilePickerError::Listing(FsError::OpenFailed { ref path, .. }) if path == "\\"
    ));
    session.assert_balanced();
    assert_handles_closed(failing.inner().stats());
}

/// Test: A directory that cannot be rewound is not listed
#[test]
fn test_rewind_failure() {
    let session = TestSession::new();
    let esp = standard_volumes().handles()[0];
    let (result, failing, _) = run_with_policy(
        &session,
        |_| FailurePolicy::SetPosition,
        request().with_volume(esp),
        vec![],
    );

    assert_eq!(
        result.unwrap_err(),
        FilePickerError::Listing(FsError::Read {
            path: "\\".to_string(),
            source: FileError::DeviceError
        })
    );
    session.assert_balanced();
    assert_handles_closed(failing.inner().stats());
}

/// Test: Missing file info stops the listing
#[test]
fn test_file_info_failure() {
    let session = TestSession::new();
    let esp = standard_volumes().handles()[0];
    let (result, failing, _) = run_with_policy(
        &session,
        |_| FailurePolicy::FileInfo,
        request().with_volume(esp).with_start("\\EFI"),
        vec![],
    );

    assert!(matches!(
        result.unwrap_err(),
        FilePickerError::Listing(FsError::InfoFailed { ref path, .. }) if path == "\\EFI"
    ));
    assert!(!session.sink.at_least(LogLevel::Error).is_empty());
    session.assert_balanced();
    assert_handles_closed(failing.inner().stats());
}

/// Test: A read failure at any point of a session is clean
///
/// Moves the failing read through the session until it completes.
#[test]
fn test_read_failure_at_every_point() {
    let mut completed = false;

    for reads in 0..128 {
        let session = TestSession::new();
        let esp = standard_volumes().handles()[0];
        let (result, failing, _) = run_with_policy(
            &session,
            |_| FailurePolicy::AfterReads(reads),
            request().with_volume(esp).with_start("\\EFI"),
            vec![Some(1), Some(1)],
        );

        match result {
            Ok(outcome) => {
                assert_eq!(outcome.path(), Some("\\EFI\\BOOT\\BOOTX64.EFI"));
                drop(outcome);
                completed = true;
            }
            Err(err) => {
                assert!(
                    matches!(err, FilePickerError::Listing(FsError::Read { .. })),
                    "read {} failed with {:?}",
                    reads,
                    err
                );
                assert_eq!(failing.injected_failures(), 1);
            }
        }
        session.assert_balanced();
        assert_handles_closed(failing.inner().stats());
        if completed {
            break;
        }
    }

    assert!(completed, "session never completed");
}
