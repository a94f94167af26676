use std::time::Duration;

pub const RESET_DELAY: Duration = Duration::from_millis(10);
pub const RESET_POST: Duration = Duration::from_secs(2);

/// Digital output wired to the module's reset pin
pub trait ResetLine {
    fn set_low(&mut self) -> std::io::Result<()>;
    fn set_high(&mut self) -> std::io::Result<()>;
}

/// Pulse the reset line and wait for the module to boot.
///
/// Needed once after host boot or a module power cycle. The line is left
/// high.
pub async fn hard_reset<R: ResetLine + ?Sized>(line: &mut R) -> std::io::Result<()> {
    log::info!("Hard resetting RAK811 module");
    line.set_low()?;
    tokio::time::sleep(RESET_DELAY).await;
    line.set_high()?;
    tokio::time::sleep(RESET_POST).await;
    Ok(())
}
