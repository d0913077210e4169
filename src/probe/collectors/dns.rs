use once_cell::sync::Lazy;
use prometheus::Gauge;
use tokio::net;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{LookupIpStrategy, Protocol, ResolverConfig, ResolverOpts};

use crate::context::Context;
use crate::metrics::{Desc, Registry};
use crate::probe::errors::{DnsError, ProbeError};
use crate::probe::models::{DnsConfig, Network};

pub(crate) const SUCCESS: Desc = Desc {
  name: "connectivity_dns_success",
  help: "Successful dns lookup",
  labels: &["network", "host", "resolver"],
};

static SYSTEM_CONF: Lazy<Result<(ResolverConfig, ResolverOpts), String>> = Lazy::new(|| {
  trust_dns_resolver::system_conf::read_system_conf().map_err(|error| error.to_string())
});

enum Resolver {
  /// Platform resolver (`getaddrinfo`).
  System,

  /// Resolver talking `DNS` over `TCP` to name servers of one family.
  Custom(TokioAsyncResolver),

  /// The custom resolver could not be configured.
  Unavailable(String),
}

pub struct Dns {
  config: DnsConfig,
  success: Gauge,
  resolver: Resolver,
}

impl Dns {
  pub fn new(config: DnsConfig, registry: &Registry) -> Result<Self, ProbeError> {
    let labels = [
      config.network.as_str(),
      config.host.as_str(),
      config.resolver_kind(),
    ];

    let resolver = if config.custom_resolver {
      match &*SYSTEM_CONF {
        Ok(system) => {
          let (resolver_config, opts) = custom_config(config.network, system);
          Resolver::Custom(TokioAsyncResolver::tokio(resolver_config, opts))
        }
        Err(reason) => Resolver::Unavailable(reason.clone()),
      }
    } else {
      Resolver::System
    };

    Ok(Self {
      success: registry.gauge(&SUCCESS, &labels)?,
      config,
      resolver,
    })
  }

  pub fn config(&self) -> &DnsConfig {
    &self.config
  }

  pub async fn run(&self, ctx: &Context) {
    let config = &self.config;

    match self.lookup(ctx).await {
      Ok(addresses) => {
        tracing::debug!(
          network = %config.network,
          host = %config.host,
          resolver = config.resolver_kind(),
          addresses,
          "Lookup succeeded"
        );
        self.success.set(1.0);
      }
      Err(error) => {
        self.success.set(0.0);
        tracing::info!(
          network = %config.network,
          host = %config.host,
          resolver = config.resolver_kind(),
          %error,
          "Lookup failed"
        );
      }
    }
  }

  /// Resolve the configured host and return the number of addresses found.
  pub async fn lookup(&self, ctx: &Context) -> Result<usize, DnsError> {
    match ctx.bounded(self.resolve()).await {
      Ok(result) => result,
      Err(_) => Err(DnsError::Timeout),
    }
  }

  async fn resolve(&self) -> Result<usize, DnsError> {
    let host = self.config.host.as_str();

    let addresses = match &self.resolver {
      Resolver::System => net::lookup_host((host, 0)).await?.count(),
      Resolver::Custom(resolver) => resolver.lookup_ip(host).await?.iter().count(),
      Resolver::Unavailable(reason) => return Err(DnsError::SystemConf(reason.clone())),
    };

    if addresses == 0 {
      return Err(DnsError::NoRecords {
        host: host.to_string(),
      });
    }

    Ok(addresses)
  }
}

/// Derive a resolver configuration that only dials `TCP` name servers of
/// `network`, so the lookup itself travels over that family.
fn custom_config(
  network: Network,
  (config, opts): &(ResolverConfig, ResolverOpts),
) -> (ResolverConfig, ResolverOpts) {
  let name_servers: Vec<_> = config
    .name_servers()
    .iter()
    .filter(|server| server.protocol == Protocol::Tcp && network.allows(&server.socket_addr))
    .cloned()
    .collect();

  let config = ResolverConfig::from_parts(
    config.domain().cloned(),
    config.search().to_vec(),
    name_servers,
  );

  let mut opts = opts.clone();
  opts.cache_size = 0;
  opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

  (config, opts)
}
