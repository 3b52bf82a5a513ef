//! End-to-end flow orchestration tests against the stub service.

mod support;

use quantauth_client::{
    AuthOrchestrator, CredentialInput, FactorPolicy, FactorRule, FingerprintTemplate, FlowError,
    FlowStage,
};
use support::{StubService, face_sample, register_user};

/// Test the full registration path: credentials, both factors, submission.
#[actix_web::test]
async fn test_registration_flow_end_to_end() {
    let stub = StubService::spawn().await;
    let mut flow = AuthOrchestrator::registration(FactorPolicy::dual_mandatory(), stub.client());

    flow.advance(CredentialInput::registration(
        "alice",
        "alice@example.com",
        "password1",
        "password1",
    ))
    .expect("valid credentials should advance");
    flow.record_face(face_sample()).expect("face should record");
    flow.record_fingerprint(FingerprintTemplate::generate())
        .expect("fingerprint should record");
    assert!(flow.can_submit());

    let success = flow.submit().await.expect("submission should succeed");

    assert_eq!(flow.stage(), FlowStage::Succeeded);
    assert!(flow.last_failure().is_none());
    assert_eq!(success.profile.username, "alice");
    assert!(success.profile.biometrics_registered.face);
    assert!(success.profile.biometrics_registered.fingerprint);
    assert_eq!(
        flow.outcome().map(|outcome| outcome.profile.id),
        Some(success.profile.id)
    );

    stub.stop().await;
}

/// Test that a service rejection steps back to biometric collection with
/// the captured factors and the banner message intact, and that the flow
/// can be resubmitted as-is.
#[actix_web::test]
async fn test_rejection_keeps_factors_for_resubmission() {
    let stub = StubService::spawn().await;
    let client = stub.client();
    register_user(&client, "taken").await;

    let mut flow = AuthOrchestrator::registration(FactorPolicy::dual_mandatory(), client);
    flow.advance(CredentialInput::registration(
        "taken",
        "second@example.com",
        "password1",
        "password1",
    ))
    .expect("valid credentials should advance");
    flow.record_face(face_sample()).expect("face should record");
    flow.record_fingerprint(FingerprintTemplate::generate())
        .expect("fingerprint should record");

    let err = flow.submit().await.expect_err("username is taken");
    assert!(matches!(err, FlowError::Service(_)));
    assert_eq!(flow.stage(), FlowStage::CollectingBiometrics);
    assert_eq!(flow.last_failure(), Some("Username already exists"));
    assert!(flow.captured_face().is_some(), "face survives rejection");
    assert!(
        flow.captured_fingerprint().is_some(),
        "fingerprint survives rejection"
    );
    assert!(flow.can_submit(), "nothing needs recapturing");

    // resubmitting without changes repeats the same rejection
    let err = flow.submit().await.expect_err("username is still taken");
    assert!(matches!(err, FlowError::Service(_)));
    assert_eq!(flow.last_failure(), Some("Username already exists"));

    stub.stop().await;
}

/// Test that a login under an all-optional policy submits without factors.
#[actix_web::test]
async fn test_login_with_optional_factors_submits_bare() {
    let stub = StubService::spawn().await;
    let client = stub.client();
    register_user(&client, "hank").await;

    let mut flow = AuthOrchestrator::login(FactorPolicy::face_optional(), client);
    flow.advance(CredentialInput::login("hank", "password1"))
        .expect("valid credentials should advance");
    assert!(flow.can_submit());

    let success = flow.submit().await.expect("login should succeed");
    assert_eq!(success.message.as_deref(), Some("Login successful"));
    assert_eq!(flow.stage(), FlowStage::Succeeded);

    stub.stop().await;
}

/// Test that a cleared face can be recaptured before submission.
#[actix_web::test]
async fn test_cleared_face_can_be_recaptured() {
    let stub = StubService::spawn().await;
    let policy = FactorPolicy {
        face: FactorRule::Required,
        fingerprint: FactorRule::Optional,
    };
    let mut flow = AuthOrchestrator::registration(policy, stub.client());

    flow.advance(CredentialInput::registration(
        "iris",
        "iris@example.com",
        "password1",
        "password1",
    ))
    .expect("valid credentials should advance");
    flow.record_face(face_sample()).expect("face should record");
    flow.clear_face().expect("clearing a captured face is allowed");
    assert!(flow.captured_face().is_none());
    assert!(!flow.can_submit(), "required face is outstanding again");

    flow.record_face(face_sample()).expect("recapture should record");
    let success = flow.submit().await.expect("submission should succeed");
    assert!(success.profile.biometrics_registered.face);

    stub.stop().await;
}

/// Test that a completed flow refuses further mutation and submission.
#[actix_web::test]
async fn test_completed_flow_is_sealed() {
    let stub = StubService::spawn().await;
    let mut flow = AuthOrchestrator::registration(FactorPolicy::face_optional(), stub.client());

    flow.advance(CredentialInput::registration(
        "judy",
        "judy@example.com",
        "password1",
        "password1",
    ))
    .expect("valid credentials should advance");
    flow.submit().await.expect("submission should succeed");

    let err = flow.submit().await.expect_err("flow already succeeded");
    assert!(matches!(
        err,
        FlowError::InvalidStage {
            required: FlowStage::CollectingBiometrics,
            actual: FlowStage::Succeeded,
        }
    ));
    let err = flow
        .record_face(face_sample())
        .expect_err("factors are frozen after success");
    assert!(matches!(err, FlowError::InvalidStage { .. }));

    stub.stop().await;
}

/// Test that a login rejection relays the service message as the banner.
#[actix_web::test]
async fn test_login_rejection_banner_is_relayed() {
    let stub = StubService::spawn().await;
    let client = stub.client();
    register_user(&client, "kate").await;

    let mut flow = AuthOrchestrator::login(FactorPolicy::face_optional(), client);
    flow.advance(CredentialInput::login("kate", "not-her-password"))
        .expect("credentials are well-formed, just wrong");

    let err = flow.submit().await.expect_err("password is wrong");
    assert!(matches!(err, FlowError::Service(_)));
    assert_eq!(flow.last_failure(), Some("Invalid username or password"));
    assert_eq!(flow.stage(), FlowStage::CollectingBiometrics);

    stub.stop().await;
}
