use tracing::instrument::WithSubscriber;

use crate::context::Context;
use crate::probe::models::Probe;

impl Probe {
  /// Performs one check and records the outcome in the probe's gauges.
  ///
  /// The behavior depends on the probe variant:
  ///
  /// - **`Probe::Tcp`** – Connects over the configured family, then samples
  ///   the kernel round trip time of the established connection.
  /// - **`Probe::Dns`** – Resolves the host with the system or the custom
  ///   resolver.
  /// - **`Probe::Http`** – Issues a `GET`; any response is a success.
  ///
  /// Nothing is returned: failures are logged through the context logger and
  /// show up as a `0` in the success gauge. The context deadline bounds all
  /// network I/O.
  pub async fn run(&self, ctx: &Context) {
    let check = async {
      match self {
        Probe::Tcp(probe) => probe.run(ctx).await,
        Probe::Dns(probe) => probe.run(ctx).await,
        Probe::Http(probe) => probe.run(ctx).await,
      }
    };

    check.with_subscriber(ctx.logger()).await
  }
}
