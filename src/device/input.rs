// App lifecycle and touch input on top of the command gateway.
use crate::config::Variant;
use crate::device::command::DeviceCommand;
use crate::device::gateway::CommandGateway;
use crate::errors::AutobuyResult;
use crate::perception::types::Point;

pub async fn tap(gateway: &dyn CommandGateway, at: Point) -> AutobuyResult<()> {
    gateway.run(&DeviceCommand::Tap(at)).await?;
    tracing::debug!(x = at.x, y = at.y, "tap dispatched");
    Ok(())
}

/// Start the variant's main activity by explicit intent.
pub async fn launch(gateway: &dyn CommandGateway, variant: &Variant) -> AutobuyResult<()> {
    gateway
        .run(&DeviceCommand::StartActivity {
            package: variant.package.clone(),
            activity: variant.activity.clone(),
        })
        .await?;
    tracing::info!(variant = %variant.name, package = %variant.package, "app launched");
    Ok(())
}

pub async fn force_stop(gateway: &dyn CommandGateway, variant: &Variant) -> AutobuyResult<()> {
    gateway
        .run(&DeviceCommand::ForceStop {
            package: variant.package.clone(),
        })
        .await?;
    tracing::info!(variant = %variant.name, package = %variant.package, "app stopped");
    Ok(())
}
