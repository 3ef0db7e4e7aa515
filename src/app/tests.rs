use super::*;
use crate::config::{CameraSource, FramecastConfig};
use crate::error::{CameraError, FramecastError};
use crate::upload::mock::MockTransport;
use std::sync::Arc;
use std::time::Duration;

fn create_test_config() -> FramecastConfig {
    let mut config = FramecastConfig::default();
    config.camera.source = CameraSource::Synthetic;
    config.camera.resolution = (64, 48);
    config.camera.fps = 50;
    config.sampler.interval_ms = 100;
    config.upload.shutdown_grace_ms = 1_000;
    config.system.stats_interval_seconds = 0;
    config
}

async fn create_orchestrator(transport: Arc<MockTransport>) -> FramecastOrchestrator {
    FramecastOrchestrator::with_transport(create_test_config(), transport)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = create_orchestrator(Arc::new(MockTransport::new())).await;

    // No components registered until initialize
    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());
    assert_eq!(orchestrator.stats(), crate::pipeline::PipelineStats::default());
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let mut orchestrator = create_orchestrator(Arc::new(MockTransport::new())).await;
    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), 3);
    for component in ["camera", "pipeline", "uploads"] {
        assert_eq!(states.get(component), Some(&ComponentState::Stopped));
    }
}

#[tokio::test]
async fn test_unavailable_device_fails_creation() {
    let mut config = create_test_config();
    config.camera.source = CameraSource::Device;
    config.camera.index = 250;

    match FramecastOrchestrator::with_transport(config, Arc::new(MockTransport::new())).await {
        Err(FramecastError::Camera(CameraError::DeviceOpen { .. }))
        | Err(FramecastError::Camera(CameraError::Configuration { .. })) => {}
        Err(e) => panic!("Unexpected orchestrator error: {}", e),
        Ok(_) => panic!("Expected camera device 250 to be unavailable"),
    }
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_start() {
    let mut config = create_test_config();
    config.camera.channel_capacity = 0;

    match FramecastOrchestrator::with_transport(config, Arc::new(MockTransport::new())).await {
        Err(FramecastError::Config(_)) => {}
        Err(e) => panic!("Unexpected orchestrator error: {}", e),
        Ok(_) => panic!("Expected a zero channel capacity to be rejected"),
    }

    let mut config = create_test_config();
    config.camera.fps = 2_000_000;
    assert!(matches!(
        FramecastOrchestrator::with_transport(config, Arc::new(MockTransport::new())).await,
        Err(FramecastError::Config(_))
    ));
}

#[tokio::test]
async fn test_component_state_transitions() {
    let orchestrator = create_orchestrator(Arc::new(MockTransport::new())).await;
    let component = "test_component";

    assert_eq!(orchestrator.get_component_state(component).await, None);

    for state in [
        ComponentState::Starting,
        ComponentState::Running,
        ComponentState::Stopping,
        ComponentState::Stopped,
    ] {
        orchestrator
            .set_component_state(component, state.clone())
            .await;
        assert_eq!(
            orchestrator.get_component_state(component).await,
            Some(state)
        );
    }
}

#[tokio::test]
async fn test_run_samples_uploads_and_shuts_down() {
    let transport = Arc::new(MockTransport::new());
    let mut orchestrator = create_orchestrator(Arc::clone(&transport)).await;

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Running)
    );

    tokio::time::sleep(Duration::from_millis(450)).await;
    orchestrator
        .request_shutdown(ShutdownReason::UserRequest)
        .await;

    let exit_code = orchestrator.run().await.unwrap();
    assert_eq!(exit_code, 0);

    let stats = orchestrator.stats();
    assert!(stats.frames_received > stats.frames_accepted);
    assert!(stats.frames_accepted >= 2);
    // 100ms gate over roughly half a second
    assert!(stats.frames_accepted <= 8);
    assert_eq!(stats.conversion_failures, 0);
    assert_eq!(stats.frames_released, stats.frames_received);
    assert_eq!(stats.uploads_succeeded, stats.frames_accepted);
    assert_eq!(transport.uploaded().len() as u64, stats.uploads_succeeded);

    let pool = orchestrator.camera().pool();
    assert_eq!(pool.available(), pool.capacity());

    let states = orchestrator.get_all_component_states().await;
    assert!(states.values().all(|s| *s == ComponentState::Stopped));
}

#[tokio::test]
async fn test_shutdown_without_start() {
    let mut orchestrator = create_orchestrator(Arc::new(MockTransport::new())).await;
    orchestrator.initialize().await.unwrap();

    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
    assert_eq!(
        orchestrator.get_component_state("pipeline").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_only_first_shutdown_request_counts() {
    let mut orchestrator = create_orchestrator(Arc::new(MockTransport::new())).await;
    orchestrator.initialize().await.unwrap();

    orchestrator
        .request_shutdown(ShutdownReason::Signal("SIGTERM".to_string()))
        .await;
    orchestrator
        .request_shutdown(ShutdownReason::UserRequest)
        .await;

    assert_eq!(orchestrator.run().await.unwrap(), 0);
    // The receiver is consumed by the first run
    assert!(orchestrator.run().await.is_err());
}
