//! Service wiring: picks in-memory or persistent backends and assembles the
//! conversation engine around them.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use glasserp_conversation::{
    BusinessHoursHandoff, ConversationBackend, ConversationProcessor, ConversationStore,
    InMemoryConversationBackend, LineItemParser, LoggingChannel, OrderMaterializer, OrderParser,
    OutboundChannel, StoreSettings,
};
use glasserp_infra::external::{HttpOrderParser, StaticTokenStore, TokenStore, ZaloClient};
use glasserp_parties::{Customer, CustomerDirectory, CustomerLookup, InMemoryCustomerDirectory};
use glasserp_products::{
    GlassStructure, GlassStructureCatalog, InMemoryGlassCatalog, PriceCalculator,
};
use glasserp_sales::{InMemoryOrderRepository, OrderRepository};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("persistent stores requested but the binary was built without the `redis` feature")]
    PersistenceDisabled,

    #[error("database setup failed: {0}")]
    Database(String),

    #[error("redis setup failed: {0}")]
    Redis(String),
}

/// Everything the HTTP handlers need.
#[derive(Clone)]
pub struct AppServices {
    pub processor: Arc<ConversationProcessor>,
    pub conversations: ConversationStore,
    pub orders: Arc<dyn OrderRepository>,
    pub channel: Arc<dyn OutboundChannel>,
}

/// ERP reference data for the in-memory mode (dev, demos and tests).
#[derive(Debug, Clone, Default)]
pub struct InMemorySeed {
    pub customers: Vec<Customer>,
    pub structures: Vec<GlassStructure>,
}

struct Backends {
    conversations: Arc<dyn ConversationBackend>,
    customers: Arc<dyn CustomerDirectory>,
    catalog: Arc<dyn GlassStructureCatalog>,
    orders: Arc<dyn OrderRepository>,
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    if config.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            return Err(ServiceError::PersistenceDisabled);
        }
    }

    warn!("using in-memory stores; conversations and orders are lost on restart");
    let tokens = Arc::new(StaticTokenStore::new(config.zalo_access_token.clone()));
    let channel = default_channel(config, tokens);
    Ok(build_in_memory_services(config, InMemorySeed::default(), channel))
}

/// In-memory wiring with an explicit outbound channel.
pub fn build_in_memory_services(
    config: &AppConfig,
    seed: InMemorySeed,
    channel: Arc<dyn OutboundChannel>,
) -> AppServices {
    let backends = Backends {
        conversations: Arc::new(InMemoryConversationBackend::new()),
        customers: Arc::new(InMemoryCustomerDirectory::with_customers(seed.customers)),
        catalog: Arc::new(InMemoryGlassCatalog::with_structures(seed.structures)),
        orders: Arc::new(InMemoryOrderRepository::new()),
    };
    assemble(config, backends, channel)
}

#[cfg(feature = "redis")]
async fn build_persistent_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    use glasserp_infra::conversation_store::RedisConversationBackend;
    use glasserp_infra::db::{
        self, PostgresCustomerDirectory, PostgresGlassCatalog, PostgresOrderRepository,
    };
    use glasserp_infra::external::RedisTokenStore;

    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| ServiceError::Database("DATABASE_URL not set".into()))?;
    let redis_url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| ServiceError::Redis("REDIS_URL not set".into()))?;

    let pool = db::connect(database_url)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;
    db::ensure_schema(&pool)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    let conversations = RedisConversationBackend::new(redis_url, None)
        .map_err(|e| ServiceError::Redis(e.to_string()))?;
    let tokens: Arc<dyn TokenStore> = match &config.zalo_access_token {
        Some(token) => Arc::new(StaticTokenStore::new(Some(token.clone()))),
        None => Arc::new(
            RedisTokenStore::new(redis_url).map_err(|e| ServiceError::Redis(e.to_string()))?,
        ),
    };

    info!("using Postgres and Redis stores");
    let backends = Backends {
        conversations: Arc::new(conversations),
        customers: Arc::new(PostgresCustomerDirectory::new(pool.clone())),
        catalog: Arc::new(PostgresGlassCatalog::new(pool.clone())),
        orders: Arc::new(PostgresOrderRepository::new(pool)),
    };
    let channel = default_channel(config, tokens);
    Ok(assemble(config, backends, channel))
}

/// Zalo delivery when a token source exists, log-only otherwise.
fn default_channel(config: &AppConfig, tokens: Arc<dyn TokenStore>) -> Arc<dyn OutboundChannel> {
    if config.zalo_access_token.is_none() && !config.use_persistent_stores {
        warn!("ZALO_ACCESS_TOKEN not set; replies are only logged");
        return Arc::new(LoggingChannel);
    }
    Arc::new(ZaloClient::new(
        config.zalo_send_url.clone(),
        tokens,
        config.http_timeout,
    ))
}

fn order_parser(config: &AppConfig) -> Arc<dyn OrderParser> {
    match &config.order_parser_url {
        Some(url) => {
            info!(%url, "using external order parser");
            Arc::new(HttpOrderParser::new(url.clone(), config.http_timeout))
        }
        None => {
            info!("ORDER_PARSER_URL not set; using the built-in line parser");
            Arc::new(LineItemParser::new())
        }
    }
}

fn assemble(config: &AppConfig, backends: Backends, channel: Arc<dyn OutboundChannel>) -> AppServices {
    let Backends {
        conversations,
        customers,
        catalog,
        orders,
    } = backends;

    let store = ConversationStore::new(
        conversations,
        StoreSettings {
            ttl: config.conversation_ttl,
            history_limit: config.history_limit,
            ..StoreSettings::default()
        },
    );
    let lookup = CustomerLookup::new(customers);
    let materializer = OrderMaterializer::new(
        PriceCalculator::new(catalog),
        lookup.clone(),
        orders.clone(),
    );
    let processor = ConversationProcessor::new(
        store.clone(),
        lookup,
        order_parser(config),
        materializer,
        Arc::new(BusinessHoursHandoff::new(config.staff_forward_delay)),
    );

    AppServices {
        processor: Arc::new(processor),
        conversations: store,
        orders,
        channel,
    }
}
