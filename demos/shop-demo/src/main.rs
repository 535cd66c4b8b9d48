use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use weft_aop::{DefaultPointcut, Pointcut, ProxyingBeanPostProcessor};
use weft_core::prelude::*;

// ==================== 业务接口 ====================

#[derive(Debug, thiserror::Error)]
enum ShopError {
    #[error("out of stock: '{sku}' requested {requested}, available {available}")]
    OutOfStock { sku: String, requested: u32, available: u32 },

    #[error("unknown sku '{0}'")]
    UnknownSku(String),
}

/// 库存仓储：只有扣减库存需要事务
#[interceptable]
pub trait InventoryRepository: Send + Sync {
    #[marker("Transactional")]
    fn reserve(&self, sku: String, quantity: u32) -> anyhow::Result<u32>;

    fn stock(&self, sku: String) -> anyhow::Result<u32>;
}

/// 订单服务：所有公开方法都在事务中执行
#[interceptable("Transactional")]
pub trait OrderService: Send + Sync {
    fn place_order(&self, sku: String, quantity: u32) -> anyhow::Result<u64>;
}

// ==================== 实现 ====================

struct InMemoryInventory {
    stock: Mutex<HashMap<String, u32>>,
}

impl InMemoryInventory {
    fn seeded() -> Self {
        let stock = [("keyboard", 5), ("monitor", 1)]
            .into_iter()
            .map(|(sku, count)| (sku.to_string(), count))
            .collect();
        Self { stock: Mutex::new(stock) }
    }
}

impl InventoryRepository for InMemoryInventory {
    fn reserve(&self, sku: String, quantity: u32) -> anyhow::Result<u32> {
        let mut stock = self.stock.lock();
        let available = stock.get_mut(&sku).ok_or_else(|| ShopError::UnknownSku(sku.clone()))?;
        if *available < quantity {
            return Err(ShopError::OutOfStock {
                sku,
                requested: quantity,
                available: *available,
            }
            .into());
        }
        *available -= quantity;
        Ok(*available)
    }

    fn stock(&self, sku: String) -> anyhow::Result<u32> {
        self.stock
            .lock()
            .get(&sku)
            .copied()
            .ok_or_else(|| ShopError::UnknownSku(sku).into())
    }
}

#[derive(Default)]
struct AuditLog {
    entries: Mutex<Vec<String>>,
}

impl AuditLog {
    fn record(&self, entry: String) {
        tracing::info!("audit: {}", entry);
        self.entries.lock().push(entry);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

struct DefaultOrderService {
    inventory: Arc<dyn InventoryRepository>,
    audit_log: Option<Arc<AuditLog>>,
    next_id: AtomicU64,
}

impl OrderService for DefaultOrderService {
    fn place_order(&self, sku: String, quantity: u32) -> anyhow::Result<u64> {
        let remaining = self
            .inventory
            .reserve(sku.clone(), quantity)
            .with_context(|| format!("Failed to place order for '{}'", sku))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(audit_log) = &self.audit_log {
            audit_log.record(format!("order #{} reserved {} x {} ({} left)", id, quantity, sku, remaining));
        }
        Ok(id)
    }
}

// ==================== 类型注册 ====================

fn inventory_class() -> Arc<BeanClass> {
    BeanClass::builder::<InMemoryInventory>("shop::InMemoryInventory")
        .interceptable::<dyn InventoryRepository>(|r| r)
        .constructor0(|| Ok(InMemoryInventory::seeded()))
        .build()
}

fn audit_log_class() -> Arc<BeanClass> {
    BeanClass::builder::<AuditLog>("shop::AuditLog")
        .constructor0(|| Ok(AuditLog::default()))
        .build()
}

fn order_service_class() -> Arc<BeanClass> {
    BeanClass::builder::<DefaultOrderService>("shop::DefaultOrderService")
        .interceptable::<dyn OrderService>(|s| s)
        .constructor1::<dyn InventoryRepository, _>(|inventory| {
            Ok(DefaultOrderService {
                inventory,
                audit_log: None,
                next_id: AtomicU64::new(1),
            })
        })
        .setter::<AuditLog, _, _>("set_audit_log", |service: &mut DefaultOrderService, audit_log| {
            service.audit_log = Some(audit_log)
        })
        .build()
}

/// 对所有 `*Service` 类型的方法记录调用日志
fn service_pointcut_class() -> Arc<BeanClass> {
    BeanClass::builder::<DefaultPointcut>("shop::ServicePointcut")
        .implements::<dyn Pointcut>(|p| p)
        .constructor0(|| Ok(DefaultPointcut::execution("* *Service.*(..)")?))
        .build()
}

weft_core::submit_class!(inventory_class);
weft_core::submit_class!(audit_log_class);
weft_core::submit_class!(order_service_class);
weft_core::submit_class!(service_pointcut_class);

// ==================== 启动 ====================

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    let context = ApplicationContext::new("shop-demo");
    let classes = ClassRegistry::with_submitted();
    let loaded = context.load_definitions_str(include_str!("../beans.toml"), &classes)?;
    tracing::debug!("{} definitions registered from beans.toml", loaded);

    context.add_bean_post_processor(Arc::new(ProxyingBeanPostProcessor::new(context.get_bean_factory())));
    context.refresh()?;

    let orders = context.get_bean_typed::<dyn OrderService>("orderService")?;
    let inventory = context.get_bean_typed::<dyn InventoryRepository>("inventoryRepository")?;

    let id = orders.place_order("keyboard".to_string(), 2)?;
    tracing::info!("Placed order #{}, {} keyboard(s) left", id, inventory.stock("keyboard".to_string())?);

    match orders.place_order("monitor".to_string(), 3) {
        Ok(id) => tracing::warn!("Unexpectedly placed order #{}", id),
        Err(e) => {
            let cause = e.downcast_ref::<ShopError>().map(ToString::to_string);
            tracing::info!("Order rejected and rolled back: {:#} (cause: {:?})", e, cause);
        }
    }

    let audit_log = context.get_bean_typed::<AuditLog>("auditLog")?;
    tracing::info!(
        "Context '{}' holds {} singletons, {} audit entries",
        context.get_app_name(),
        context.get_bean_factory().get_singleton_count(),
        audit_log.len()
    );

    Ok(())
}
