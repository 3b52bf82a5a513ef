use std::env;
use std::error::Error;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quantauth_client::{
    AppShell, AuthOrchestrator, CaptureConfig, CaptureResource, CaptureStage, CredentialInput,
    FactorPolicy, FileTokenStore, FingerprintConfig, FingerprintSimulator, FlowKind,
    ServiceConfig, SessionClient, SessionState, SessionStoreConfig, SimulatedCamera,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_time = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        commit = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        "starting quantauth client"
    );

    let service_config = ServiceConfig::from_env();
    let policy = FactorPolicy::from_env();
    let store = FileTokenStore::new(&SessionStoreConfig::from_env());

    let client = SessionClient::new(&service_config)?;
    let mut shell = AppShell::new(
        client,
        Box::new(store),
        policy,
        service_config.health_probe.clone(),
    );

    shell.bootstrap().await;

    match shell.state() {
        SessionState::Authenticated { profile } => {
            info!(username = %profile.username, "session restored; already signed in");
        }
        SessionState::Unauthenticated => {
            info!("no active session");
        }
    }

    // Scripted end-to-end run against a live service, driven by env vars:
    // DEMO_FLOW=register|login plus DEMO_USERNAME / DEMO_PASSWORD / DEMO_EMAIL.
    if let Ok(flow) = env::var("DEMO_FLOW") {
        run_demo_flow(&mut shell, &flow).await?;
    }

    Ok(())
}

async fn run_demo_flow(shell: &mut AppShell, flow: &str) -> Result<(), Box<dyn Error>> {
    let kind = match flow {
        "register" => FlowKind::Registration,
        "login" => FlowKind::Login,
        other => {
            warn!(flow = other, "unknown DEMO_FLOW value; expected 'register' or 'login'");
            return Ok(());
        }
    };

    let username = env::var("DEMO_USERNAME").unwrap_or_else(|_| "demo-user".to_string());
    let password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "demo-password-1".to_string());
    let email = env::var("DEMO_EMAIL").unwrap_or_else(|_| format!("{username}@example.com"));

    let mut orchestrator = match kind {
        FlowKind::Registration => shell.registration_flow(),
        FlowKind::Login => shell.login_flow(),
    };

    let input = match kind {
        FlowKind::Registration => {
            CredentialInput::registration(username, email, password.clone(), password)
        }
        FlowKind::Login => CredentialInput::login(username, password),
    };
    orchestrator.advance(input)?;

    collect_factors(&mut orchestrator).await?;

    match orchestrator.submit().await {
        Ok(success) => {
            shell.complete_authentication(success)?;
            info!("demo flow authenticated");
        }
        Err(err) => {
            warn!(
                error = %err,
                banner = orchestrator.last_failure().unwrap_or("none"),
                "demo flow rejected"
            );
        }
    }
    Ok(())
}

async fn collect_factors(orchestrator: &mut AuthOrchestrator) -> Result<(), Box<dyn Error>> {
    let policy = *orchestrator.policy();

    if !policy.face.is_disabled() {
        let capture_config = CaptureConfig::from_env();
        let camera = Arc::new(SimulatedCamera::new(
            capture_config.frame_width,
            capture_config.frame_height,
        ));
        let mut capture = CaptureResource::new(camera);
        let mut stages = capture.watch_stage();

        capture.acquire().await?;
        capture.arm(capture_config.countdown_seconds)?;
        stages
            .wait_for(|stage| *stage == CaptureStage::Captured)
            .await?;
        let sample = capture.take_sample()?;
        info!(digest = %sample.digest(), "face sample captured");
        orchestrator.record_face(sample)?;
    }

    if !policy.fingerprint.is_disabled() {
        let mut reader = FingerprintSimulator::new(&FingerprintConfig::from_env());
        let template = reader.scan().await?;
        info!(template = %template.id, "fingerprint scanned");
        orchestrator.record_fingerprint(template)?;
    }

    Ok(())
}
