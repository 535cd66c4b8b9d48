//! 代理 BeanPostProcessor - 自动为匹配的 Bean 创建 AOP 代理
//!
//! 在 Bean 初始化后查找所有类匹配通过的 Advisor，用代理替换原始 Bean。

use std::any::TypeId;
use std::sync::{Arc, Weak};

use weft_core::{Bean, BeanPostProcessor, ListableBeanFactory};

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::pointcut::Pointcut;
use crate::proxy::AdvisedInterceptor;
use crate::transaction::TransactionManager;

/// 代理 BeanPostProcessor
///
/// ## 工作原理
///
/// 1. 跳过基础设施 Bean（Advisor、Pointcut、Advice、TransactionManager、BeanPostProcessor）
/// 2. 按注册顺序获取其他所有 Advisor Bean，保留类匹配器接受当前 Bean 类型的
/// 3. 有匹配时用 [`AdvisedInterceptor`] 生成代理替换原始 Bean
///
/// 代理只包装 `#[interceptable]` 能力；匹配但没有可拦截能力的 Bean 原样返回。
///
/// ## 使用示例
///
/// ```ignore
/// use weft_aop::ProxyingBeanPostProcessor;
///
/// let factory = Arc::new(DefaultListableBeanFactory::new());
/// factory.add_bean_post_processor(Arc::new(ProxyingBeanPostProcessor::new(&factory)));
/// ```
pub struct ProxyingBeanPostProcessor {
    bean_factory: Weak<dyn ListableBeanFactory>,
}

impl ProxyingBeanPostProcessor {
    /// 创建处理器，持有容器的弱引用以免形成引用环
    pub fn new<F: ListableBeanFactory + 'static>(bean_factory: &Arc<F>) -> Self {
        let bean_factory: Weak<F> = Arc::downgrade(bean_factory);
        Self { bean_factory }
    }

    fn is_infrastructure(bean: &Bean) -> bool {
        bean.is::<dyn Advisor>()
            || bean.is::<dyn Pointcut>()
            || bean.is::<dyn Advice>()
            || bean.is::<dyn TransactionManager>()
            || bean.is::<dyn BeanPostProcessor>()
    }

    /// 类匹配器接受该 Bean 类型的 Advisor（按注册顺序）
    fn find_applicable_advisors(
        &self,
        bean_factory: &dyn ListableBeanFactory,
        bean: &Bean,
        bean_name: &str,
    ) -> Vec<Arc<dyn Advisor>> {
        let target_type = bean.type_info();

        bean_factory
            .get_bean_names_for_type(TypeId::of::<dyn Advisor>())
            .into_iter()
            .filter(|name| name != bean_name)
            .filter_map(|name| match bean_factory.get_bean(&name) {
                Ok(advisor_bean) => {
                    let advisor = advisor_bean.get::<dyn Advisor>();
                    if advisor.is_none() {
                        tracing::warn!("Bean '{}' no longer exposes Advisor, skipping", name);
                    }
                    advisor
                }
                Err(e) => {
                    tracing::warn!("Error getting advisor bean '{}', skipping: {}", name, e);
                    None
                }
            })
            .filter(|advisor| advisor.pointcut().class_matcher().matches(target_type))
            .collect()
    }
}

impl BeanPostProcessor for ProxyingBeanPostProcessor {
    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> anyhow::Result<Option<Bean>> {
        if Self::is_infrastructure(&bean) {
            tracing::trace!("Bean '{}' is AOP infrastructure, skipping proxy creation", bean_name);
            return Ok(Some(bean));
        }

        let Some(bean_factory) = self.bean_factory.upgrade() else {
            tracing::warn!("Bean factory is gone, cannot look up advisors for '{}'", bean_name);
            return Ok(Some(bean));
        };

        let advisors = self.find_applicable_advisors(bean_factory.as_ref(), &bean, bean_name);
        if advisors.is_empty() {
            tracing::trace!("Bean '{}' does not match any advisor", bean_name);
            return Ok(Some(bean));
        }

        let advisor_count = advisors.len();
        let interceptor = Arc::new(AdvisedInterceptor::new(bean.clone(), advisors));
        match bean.proxied(interceptor) {
            Some(proxy) => {
                tracing::debug!("Created proxy for bean '{}' with {} advisor(s)", bean_name, advisor_count);
                Ok(Some(proxy))
            }
            None => {
                tracing::warn!(
                    "Bean '{}' ({}) matches {} advisor(s) but exposes no interceptable capability, leaving it unproxied",
                    bean_name,
                    bean.type_name(),
                    advisor_count
                );
                Ok(Some(bean))
            }
        }
    }

    fn name(&self) -> &str {
        "ProxyingBeanPostProcessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::DefaultAdvisor;
    use crate::transaction::{
        transactional_pointcut_class, LocalTransactionManager, TransactionInterceptor, TRANSACTIONAL,
    };
    use parking_lot::Mutex;
    use weft_core::{
        interceptable, BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt,
        ConfigurableBeanFactory, ContainerError, DefaultListableBeanFactory,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("order rejected: {0}")]
    struct OrderRejected(String);

    #[interceptable]
    pub trait OrderRepository: Send + Sync {
        #[marker("Transactional")]
        fn save(&self, item: String) -> anyhow::Result<u64>;

        fn count(&self) -> anyhow::Result<usize>;
    }

    #[interceptable("Transactional")]
    pub trait OrderService: Send + Sync {
        fn place_order(&self, item: String) -> anyhow::Result<u64>;

        fn in_transaction(&self) -> anyhow::Result<bool>;
    }

    #[derive(Default)]
    struct MemoryOrderRepository {
        items: Mutex<Vec<String>>,
    }

    impl OrderRepository for MemoryOrderRepository {
        fn save(&self, item: String) -> anyhow::Result<u64> {
            let mut items = self.items.lock();
            items.push(item);
            Ok(items.len() as u64)
        }

        fn count(&self) -> anyhow::Result<usize> {
            Ok(self.items.lock().len())
        }
    }

    struct OrderServiceImpl {
        repository: Arc<dyn OrderRepository>,
        transaction_manager: Option<Arc<dyn TransactionManager>>,
    }

    impl OrderService for OrderServiceImpl {
        fn place_order(&self, item: String) -> anyhow::Result<u64> {
            if item.is_empty() {
                return Err(OrderRejected("empty item".to_string()).into());
            }
            self.repository.save(item)
        }

        fn in_transaction(&self) -> anyhow::Result<bool> {
            Ok(self.transaction_manager.as_ref().is_some_and(|tm| tm.is_active()))
        }
    }

    /// 非拦截能力，代理后原样保留
    pub trait Describe: Send + Sync {
        fn describe(&self) -> String;
    }

    impl Describe for OrderServiceImpl {
        fn describe(&self) -> String {
            "order service".to_string()
        }
    }

    struct OrderReport {
        source: Arc<dyn Describe>,
    }

    /// 审计：类型级带事务标记，但没有可拦截能力
    struct AuditLog;

    struct Clock;

    /// 记录事务操作，状态按线程隔离
    struct RecordingTransactionManager {
        inner: LocalTransactionManager,
        log: Mutex<Vec<&'static str>>,
    }

    impl TransactionManager for RecordingTransactionManager {
        fn begin(&self) -> anyhow::Result<()> {
            self.log.lock().push("begin");
            self.inner.begin()
        }

        fn commit(&self) -> anyhow::Result<()> {
            self.log.lock().push("commit");
            self.inner.commit()
        }

        fn rollback(&self) -> anyhow::Result<()> {
            self.log.lock().push("rollback");
            self.inner.rollback()
        }

        fn is_active(&self) -> bool {
            self.inner.is_active()
        }
    }

    fn register(factory: &DefaultListableBeanFactory, definition: BeanDefinition) {
        let name = definition.name().to_string();
        factory.register_bean_definition(&name, definition);
    }

    fn shop_factory() -> Arc<DefaultListableBeanFactory> {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let factory = Arc::new(DefaultListableBeanFactory::new());

        register(
            &factory,
            BeanDefinition::new(
                "transactionManager",
                BeanClass::builder::<RecordingTransactionManager>("tests::RecordingTransactionManager")
                    .implements::<dyn TransactionManager>(|m| m)
                    .constructor0(|| {
                        Ok(RecordingTransactionManager {
                            inner: LocalTransactionManager::new(),
                            log: Mutex::new(Vec::new()),
                        })
                    })
                    .build(),
            ),
        );
        register(&factory, BeanDefinition::new("txPointcut", transactional_pointcut_class()));
        register(
            &factory,
            BeanDefinition::new("txInterceptor", TransactionInterceptor::bean_class())
                .with_constructor_arg("transactionManager"),
        );
        register(
            &factory,
            BeanDefinition::new("txAdvisor", DefaultAdvisor::bean_class())
                .with_constructor_arg("txPointcut")
                .with_constructor_arg("txInterceptor"),
        );
        register(
            &factory,
            BeanDefinition::new(
                "orderRepository",
                BeanClass::builder::<MemoryOrderRepository>("shop::MemoryOrderRepository")
                    .interceptable::<dyn OrderRepository>(|r| r)
                    .constructor0(|| Ok(MemoryOrderRepository::default()))
                    .build(),
            ),
        );
        register(
            &factory,
            BeanDefinition::new(
                "orderService",
                BeanClass::builder::<OrderServiceImpl>("shop::OrderServiceImpl")
                    .interceptable::<dyn OrderService>(|s| s)
                    .implements::<dyn Describe>(|s| s)
                    .constructor1::<dyn OrderRepository, _>(|repository| {
                        Ok(OrderServiceImpl {
                            repository,
                            transaction_manager: None,
                        })
                    })
                    .setter::<dyn TransactionManager, _, _>(
                        "set_transaction_manager",
                        |service: &mut OrderServiceImpl, tm| service.transaction_manager = Some(tm),
                    )
                    .build(),
            )
            .with_constructor_arg("orderRepository")
            .with_property("transactionManager", "transactionManager"),
        );
        register(
            &factory,
            BeanDefinition::new(
                "orderReport",
                BeanClass::builder::<OrderReport>("shop::OrderReport")
                    .constructor1::<dyn Describe, _>(|source| Ok(OrderReport { source }))
                    .build(),
            )
            .with_constructor_arg("orderService"),
        );
        register(
            &factory,
            BeanDefinition::new(
                "auditLog",
                BeanClass::builder::<AuditLog>("shop::AuditLog")
                    .marker(TRANSACTIONAL)
                    .constructor0(|| Ok(AuditLog))
                    .build(),
            ),
        );
        register(
            &factory,
            BeanDefinition::new(
                "clock",
                BeanClass::builder::<Clock>("shop::Clock").constructor0(|| Ok(Clock)).build(),
            ),
        );

        factory.add_bean_post_processor(Arc::new(ProxyingBeanPostProcessor::new(&factory)));
        factory
    }

    fn tx_log(factory: &DefaultListableBeanFactory) -> Vec<&'static str> {
        factory
            .get_bean_typed::<RecordingTransactionManager>("transactionManager")
            .unwrap()
            .log
            .lock()
            .clone()
    }

    #[test]
    fn test_matching_bean_is_replaced_by_proxy() {
        let factory = shop_factory();

        let service = factory.get_bean("orderService").unwrap();
        assert!(service.is_proxy());
        assert!(service.is::<dyn OrderService>());
        assert_eq!(service.type_name(), "shop::OrderServiceImpl");

        // 代理隐藏具体类型
        let Err(err) = factory.get_bean_typed::<OrderServiceImpl>("orderService") else {
            panic!("proxy must hide the concrete type");
        };
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_proxy_keeps_plain_capabilities() {
        let factory = shop_factory();
        let service = factory.get_bean("orderService").unwrap();
        assert!(service.is_proxy());
        assert!(service.is::<dyn Describe>());
        assert_eq!(
            factory.get_bean_typed::<dyn Describe>("orderService").unwrap().describe(),
            "order service"
        );
        assert!(factory
            .get_bean_names_for_type(TypeId::of::<dyn Describe>())
            .contains(&"orderService".to_string()));

        // 具体类型按声明列出，但代理不再提供该视图
        assert!(!service.is::<OrderServiceImpl>());
        assert!(factory
            .get_bean_names_for_type(TypeId::of::<OrderServiceImpl>())
            .contains(&"orderService".to_string()));

        // 依赖声明为非拦截能力时也能注入代理 Bean
        let report = factory.get_bean_typed::<OrderReport>("orderReport").unwrap();
        assert_eq!(report.source.describe(), "order service");
        assert!(tx_log(&factory).is_empty());
    }

    #[test]
    fn test_transaction_commits_and_nested_call_joins() {
        let factory = shop_factory();
        let service = factory.get_bean_typed::<dyn OrderService>("orderService").unwrap();

        assert_eq!(service.place_order("book".to_string()).unwrap(), 1);
        assert_eq!(tx_log(&factory), vec!["begin", "commit"]);

        assert!(service.in_transaction().unwrap());
    }

    #[test]
    fn test_transaction_rolls_back_with_original_error() {
        let factory = shop_factory();
        let service = factory.get_bean_typed::<dyn OrderService>("orderService").unwrap();

        let err = service.place_order(String::new()).unwrap_err();
        assert!(err.downcast_ref::<OrderRejected>().is_some());
        assert_eq!(tx_log(&factory), vec!["begin", "rollback"]);
    }

    #[test]
    fn test_method_level_marker_only_advises_marked_method() {
        let factory = shop_factory();
        let repository = factory.get_bean_typed::<dyn OrderRepository>("orderRepository").unwrap();
        assert!(factory.get_bean("orderRepository").unwrap().is_proxy());

        repository.count().unwrap();
        assert!(tx_log(&factory).is_empty());

        repository.save("pen".to_string()).unwrap();
        assert_eq!(tx_log(&factory), vec!["begin", "commit"]);
    }

    #[test]
    fn test_constructor_receives_proxied_dependency() {
        let factory = shop_factory();
        factory.get_bean("orderService").unwrap();

        // 依赖在注入前已经经过后处理
        let repository = factory.get_bean("orderRepository").unwrap();
        assert!(repository.is_proxy());
        assert!(!repository.is::<MemoryOrderRepository>());
    }

    #[test]
    fn test_infrastructure_and_unmatched_beans_stay_plain() {
        let factory = shop_factory();

        for name in ["transactionManager", "txPointcut", "txInterceptor", "txAdvisor", "clock"] {
            assert!(!factory.get_bean(name).unwrap().is_proxy(), "{name}");
        }
    }

    #[test]
    fn test_matched_bean_without_interceptable_capability_stays_plain() {
        let factory = shop_factory();
        let audit = factory.get_bean("auditLog").unwrap();
        assert!(!audit.is_proxy());
        assert!(audit.is::<AuditLog>());
    }

    #[test]
    fn test_broken_advisor_is_skipped() {
        let factory = shop_factory();
        register(
            &factory,
            BeanDefinition::new("brokenAdvisor", DefaultAdvisor::bean_class())
                .with_constructor_arg("missingPointcut")
                .with_constructor_arg("txInterceptor"),
        );

        let service = factory.get_bean_typed::<dyn OrderService>("orderService").unwrap();
        service.place_order("lamp".to_string()).unwrap();
        assert_eq!(tx_log(&factory), vec!["begin", "commit"]);
    }

    #[test]
    fn test_concurrent_calls_get_independent_transactions() {
        let factory = shop_factory();
        let service = factory.get_bean_typed::<dyn OrderService>("orderService").unwrap();

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    let item = if i % 3 == 0 { String::new() } else { format!("item-{i}") };
                    service.place_order(item).is_ok()
                })
            })
            .collect();

        let succeeded = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(succeeded, 4);

        let log = tx_log(&factory);
        assert_eq!(log.iter().filter(|op| **op == "begin").count(), 6);
        assert_eq!(log.iter().filter(|op| **op == "commit").count(), 4);
        assert_eq!(log.iter().filter(|op| **op == "rollback").count(), 2);
    }
}
