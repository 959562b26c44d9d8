use embassy_time::{Delay, Duration, Instant, Timer};
use esp_hal::gpio::Output;

use smart_door_core::api::Poll;
use smart_door_core::command::{AckStatus, DoorState, PendingCommand};
use smart_door_core::controller::{DoorController, Outcome};
use smart_door_core::VISITOR_CAPACITY;

use crate::backend::Backend;
use crate::config::CONFIG;
use crate::constants::POLL_BACKOFF_SECS;

pub type Controller = DoorController<Output<'static>, Output<'static>, VISITOR_CAPACITY>;

#[embassy_executor::task]
pub async fn door_task(mut controller: Controller, mut backend: Backend) {
    report(&mut backend, controller.state()).await;

    loop {
        match backend.poll().await {
            Ok(Poll::Command(cmd)) => handle(&mut controller, &mut backend, cmd).await,
            Ok(Poll::Rejected(e)) => {
                log::warn!("Rejecting backend command: {}", e);
                acknowledge(&mut backend, AckStatus::Rejected).await;
            }
            Ok(Poll::Idle) => log::trace!("No pending command"),
            Err(e) => {
                log::error!("Command poll failed: {:?}", e);
                Timer::after(Duration::from_secs(POLL_BACKOFF_SECS)).await;
                continue;
            }
        }

        Timer::after(Duration::from_secs(CONFIG.poll_interval_seconds.into())).await;
    }
}

async fn handle(controller: &mut Controller, backend: &mut Backend, cmd: PendingCommand) {
    let result = controller.execute(&cmd, Instant::now().as_secs(), &mut Delay);

    // Acknowledge failures too, the command has been attempted once
    acknowledge(backend, AckStatus::of(&result)).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Failed to execute {}: {:?}", cmd.command, e);
            return;
        }
    };
    report(backend, controller.state()).await;

    if let Outcome::Unlocked { logged } = outcome {
        let visitors = controller.visitors();
        if logged {
            log::info!("{} of {} visitor slots used", visitors.len(), visitors.limit());
        } else {
            log::warn!(
                "Visitor log full, {} entries not recorded",
                visitors.dropped()
            );
        }

        Timer::after(Duration::from_secs(CONFIG.unlock_seconds.into())).await;
        match controller.relock() {
            Ok(true) => report(backend, controller.state()).await,
            Ok(false) => {}
            Err(e) => log::error!("Failed to relock door: {:?}", e),
        }
    }
}

async fn acknowledge(backend: &mut Backend, status: AckStatus) {
    let now = Instant::now().as_secs();
    if let Err(e) = backend.acknowledge(now, status).await {
        log::warn!("Acknowledge failed: {:?}", e);
    }
}

async fn report(backend: &mut Backend, state: DoorState) {
    let now = Instant::now().as_secs();
    if let Err(e) = backend.report_status(state, now).await {
        log::warn!("Status report failed: {:?}", e);
    }
}
