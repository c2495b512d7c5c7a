//! Controller command channel behavior over real TCP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use greenwave::controller::{CommandChannel, TcpCommandChannel};
use greenwave::error::ChannelError;
use greenwave::phase::PhaseId;

use common::{ControllerMode, FakeController, four_green_plan};

fn channel_to(controller: &FakeController) -> TcpCommandChannel {
    TcpCommandChannel::new(
        controller.addr.to_string(),
        four_green_plan(),
        Duration::from_secs(1),
        Duration::from_millis(300),
    )
}

#[tokio::test]
async fn bare_success_token_is_accepted() {
    let controller = FakeController::spawn(ControllerMode::Success).await;
    let channel = channel_to(&controller);

    let ack = channel.send(PhaseId(0)).await.unwrap();
    assert_eq!(ack.response, "SUCCESS");
    assert_eq!(controller.commands(), vec!["GGrrrrrr".to_string()]);
}

#[tokio::test]
async fn quoted_success_token_is_accepted() {
    let controller = FakeController::spawn(ControllerMode::QuotedSuccess).await;
    let channel = channel_to(&controller);

    let ack = channel.send(PhaseId(4)).await.unwrap();
    assert_eq!(ack.response, "SUCCESS");
    assert_eq!(controller.commands(), vec!["yyrrrrrr".to_string()]);
}

#[tokio::test]
async fn non_success_response_is_rejected() {
    let controller = FakeController::spawn(ControllerMode::Failure).await;
    let channel = channel_to(&controller);

    let err = channel.send(PhaseId(0)).await.unwrap_err();
    match err {
        ChannelError::Rejected { response } => assert!(response.contains("FAILURE")),
        other => panic!("expected rejection, got {other}"),
    }
}

#[tokio::test]
async fn silent_controller_times_out() {
    let controller = FakeController::spawn(ControllerMode::Silent).await;
    let channel = channel_to(&controller);

    let err = channel.send(PhaseId(0)).await.unwrap_err();
    assert!(matches!(err, ChannelError::AckTimeout));
}

#[tokio::test]
async fn close_without_reply_is_an_error() {
    let controller = FakeController::spawn(ControllerMode::CloseWithoutReply).await;
    let channel = channel_to(&controller);

    let err = channel.send(PhaseId(0)).await.unwrap_err();
    assert!(matches!(err, ChannelError::ConnectionClosed));
}

#[tokio::test]
async fn each_command_uses_a_fresh_connection() {
    let controller = FakeController::spawn(ControllerMode::Success).await;
    let channel = channel_to(&controller);

    channel.send(PhaseId(0)).await.unwrap();
    channel.send(PhaseId(1)).await.unwrap();

    assert_eq!(controller.connection_count(), 2);
    assert_eq!(
        controller.commands(),
        vec!["GGrrrrrr".to_string(), "rrGGrrrr".to_string()]
    );
}

#[tokio::test]
async fn unreachable_controller_is_a_connect_error() {
    // Bind-then-drop to obtain a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = TcpCommandChannel::new(
        addr.to_string(),
        four_green_plan(),
        Duration::from_secs(1),
        Duration::from_millis(300),
    );
    let err = channel.send(PhaseId(0)).await.unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Connect { .. } | ChannelError::ConnectTimeout { .. }
    ));
}

#[tokio::test]
async fn failure_does_not_block_subsequent_sends() {
    let failing = FakeController::spawn(ControllerMode::Failure).await;
    let channel = channel_to(&failing);
    assert!(channel.send(PhaseId(0)).await.is_err());

    // The channel is stateless between commands; a healthy controller at
    // the same role works on the next call.
    let healthy = FakeController::spawn(ControllerMode::Success).await;
    let channel = channel_to(&healthy);
    assert!(channel.send(PhaseId(0)).await.is_ok());
}

#[tokio::test]
async fn unknown_phase_never_touches_the_wire() {
    let controller = FakeController::spawn(ControllerMode::Success).await;
    let channel = channel_to(&controller);

    let err = channel.send(PhaseId(42)).await.unwrap_err();
    assert!(matches!(err, ChannelError::UnknownPhase(PhaseId(42))));
    assert_eq!(controller.connection_count(), 0);
}

#[tokio::test]
async fn channel_is_shareable_across_tasks() {
    let controller = FakeController::spawn(ControllerMode::Success).await;
    let channel = Arc::new(channel_to(&controller));

    let a = {
        let c = Arc::clone(&channel);
        tokio::spawn(async move { c.send(PhaseId(0)).await })
    };
    let b = {
        let c = Arc::clone(&channel);
        tokio::spawn(async move { c.send(PhaseId(1)).await })
    };
    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(controller.connection_count(), 2);
}
