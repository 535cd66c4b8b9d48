//! 事务通知
//!
//! [`TransactionInterceptor`] 在没有活动事务时开启事务，调用成功后提交、失败后回滚；
//! 已有活动事务时直接加入，不做任何事务操作。

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use weft_core::{BeanClass, InvocationResult, Marker};

use crate::advice::Advice;
use crate::invocation::MethodInvocation;
use crate::matcher::{MarkerClassMatcher, MarkerMethodMatcher};
use crate::pointcut::{DefaultPointcut, Pointcut};

/// 事务标记，可以放在能力（trait）、类型或方法上
pub const TRANSACTIONAL: Marker = Marker::new("Transactional");

/// 匹配携带 [`TRANSACTIONAL`] 标记的类型和方法
pub fn transactional_pointcut() -> DefaultPointcut {
    DefaultPointcut::new(
        Arc::new(MarkerClassMatcher::new(TRANSACTIONAL)),
        Arc::new(MarkerMethodMatcher::new(TRANSACTIONAL)),
    )
}

/// [`transactional_pointcut`] 的 Bean 类型描述
pub fn transactional_pointcut_class() -> Arc<BeanClass> {
    BeanClass::builder::<DefaultPointcut>("weft_aop::transaction::TransactionalPointcut")
        .implements::<dyn Pointcut>(|p| p)
        .constructor0(|| Ok(transactional_pointcut()))
        .build()
}

/// 事务管理器
///
/// 活动状态按调用线程隔离。
pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> anyhow::Result<()>;

    fn commit(&self) -> anyhow::Result<()>;

    fn rollback(&self) -> anyhow::Result<()>;

    fn is_active(&self) -> bool;
}

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// 当前线程上有活动事务的管理器 id
    static ACTIVE_TRANSACTIONS: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

/// 本地事务管理器：只记录当前线程是否处于事务中
#[derive(Debug)]
pub struct LocalTransactionManager {
    id: u64,
}

impl LocalTransactionManager {
    pub fn new() -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<LocalTransactionManager>("weft_aop::transaction::LocalTransactionManager")
            .implements::<dyn TransactionManager>(|m| m)
            .constructor0(|| Ok(LocalTransactionManager::new()))
            .build()
    }

    fn set_active(&self, active: bool) {
        ACTIVE_TRANSACTIONS.with(|set| {
            let mut set = set.borrow_mut();
            if active {
                set.insert(self.id);
            } else {
                set.remove(&self.id);
            }
        });
    }
}

impl Default for LocalTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocalTransactionManager {
    fn drop(&mut self) {
        let _ = ACTIVE_TRANSACTIONS.try_with(|set| set.borrow_mut().remove(&self.id));
    }
}

impl TransactionManager for LocalTransactionManager {
    fn begin(&self) -> anyhow::Result<()> {
        if self.is_active() {
            tracing::warn!("Transaction is already active.");
            return Ok(());
        }
        tracing::info!("Beginning transaction.");
        self.set_active(true);
        Ok(())
    }

    fn commit(&self) -> anyhow::Result<()> {
        if !self.is_active() {
            tracing::warn!("No active transaction to commit.");
            return Ok(());
        }
        tracing::info!("Committing transaction.");
        self.set_active(false);
        Ok(())
    }

    fn rollback(&self) -> anyhow::Result<()> {
        if !self.is_active() {
            tracing::warn!("No active transaction to rollback.");
            return Ok(());
        }
        tracing::info!("Rolling back transaction.");
        self.set_active(false);
        Ok(())
    }

    fn is_active(&self) -> bool {
        ACTIVE_TRANSACTIONS.with(|set| set.borrow().contains(&self.id))
    }
}

/// 事务通知
pub struct TransactionInterceptor {
    transaction_manager: Arc<dyn TransactionManager>,
}

impl TransactionInterceptor {
    pub fn new(transaction_manager: Arc<dyn TransactionManager>) -> Self {
        Self { transaction_manager }
    }

    pub fn transaction_manager(&self) -> &Arc<dyn TransactionManager> {
        &self.transaction_manager
    }

    /// 作为 Bean 注册时使用，构造参数为事务管理器 Bean
    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<TransactionInterceptor>("weft_aop::transaction::TransactionInterceptor")
            .implements::<dyn Advice>(|t| t)
            .constructor1::<dyn TransactionManager, _>(|manager| Ok(TransactionInterceptor::new(manager)))
            .build()
    }

    fn rollback_quietly(&self, signature: &str) {
        if let Err(e) = self.transaction_manager.rollback() {
            tracing::error!("Transaction rollback failed for {}: {:#}", signature, e);
        }
    }
}

impl Advice for TransactionInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        if self.transaction_manager.is_active() {
            tracing::trace!("Joining existing transaction for {}", invocation.signature());
            return invocation.proceed();
        }

        // begin 失败时没有可回滚的事务，目标方法也不会执行
        self.transaction_manager.begin()?;

        match invocation.proceed() {
            Ok(value) => match self.transaction_manager.commit() {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.rollback_quietly(&invocation.signature());
                    Err(e)
                }
            },
            Err(e) => {
                tracing::debug!("{} failed, rolling back: {}", invocation.signature(), e);
                self.rollback_quietly(&invocation.signature());
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "TransactionInterceptor"
    }
}

impl std::fmt::Debug for TransactionInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionInterceptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{Advisor, DefaultAdvisor};
    use crate::proxy::AdvisedInterceptor;
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use weft_core::{interceptable, Bean, BeanDefinition, BeanDefinitionRegistry, BeanFactory, DefaultListableBeanFactory};

    /// 记录事务操作的管理器
    #[derive(Default)]
    struct RecordingTransactionManager {
        active: Mutex<bool>,
        log: Mutex<Vec<&'static str>>,
        fail_begin: bool,
        fail_rollback: bool,
    }

    impl TransactionManager for RecordingTransactionManager {
        fn begin(&self) -> anyhow::Result<()> {
            self.log.lock().push("begin");
            if self.fail_begin {
                return Err(anyhow!("connection pool exhausted"));
            }
            *self.active.lock() = true;
            Ok(())
        }

        fn commit(&self) -> anyhow::Result<()> {
            self.log.lock().push("commit");
            *self.active.lock() = false;
            Ok(())
        }

        fn rollback(&self) -> anyhow::Result<()> {
            self.log.lock().push("rollback");
            *self.active.lock() = false;
            if self.fail_rollback {
                return Err(anyhow!("connection lost"));
            }
            Ok(())
        }

        fn is_active(&self) -> bool {
            *self.active.lock()
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("insufficient funds: {0}")]
    struct InsufficientFunds(i64);

    #[interceptable]
    pub trait Account: Send + Sync {
        #[marker("Transactional")]
        fn withdraw(&self, amount: i64) -> anyhow::Result<i64>;

        fn owner(&self) -> anyhow::Result<String>;
    }

    struct CheckingAccount;

    impl Account for CheckingAccount {
        fn withdraw(&self, amount: i64) -> anyhow::Result<i64> {
            if amount > 100 {
                return Err(InsufficientFunds(amount).into());
            }
            Ok(100 - amount)
        }

        fn owner(&self) -> anyhow::Result<String> {
            Ok("alice".to_string())
        }
    }

    fn account_bean() -> Bean {
        let factory = DefaultListableBeanFactory::new();
        factory.register_bean_definition(
            "account",
            BeanDefinition::new(
                "account",
                BeanClass::builder::<CheckingAccount>("bank::CheckingAccount")
                    .interceptable::<dyn Account>(|a| a)
                    .constructor0(|| Ok(CheckingAccount))
                    .build(),
            ),
        );
        factory.get_bean("account").unwrap()
    }

    fn transactional_account(manager: Arc<dyn TransactionManager>) -> Arc<dyn Account> {
        let target = account_bean();
        let advisor: Arc<dyn Advisor> = Arc::new(DefaultAdvisor::new(
            Arc::new(transactional_pointcut()),
            Arc::new(TransactionInterceptor::new(manager)),
        ));
        let interceptor = AdvisedInterceptor::new(target.clone(), vec![advisor]);
        target.proxied(Arc::new(interceptor)).unwrap().get::<dyn Account>().unwrap()
    }

    #[test]
    fn test_commit_on_success() {
        let manager = Arc::new(RecordingTransactionManager::default());
        let account = transactional_account(manager.clone());

        assert_eq!(account.withdraw(30).unwrap(), 70);
        assert_eq!(*manager.log.lock(), vec!["begin", "commit"]);
        assert!(!manager.is_active());
    }

    #[test]
    fn test_rollback_on_failure_keeps_original_error() {
        let manager = Arc::new(RecordingTransactionManager::default());
        let account = transactional_account(manager.clone());

        let err = account.withdraw(500).unwrap_err();
        assert_eq!(err.downcast_ref::<InsufficientFunds>().map(|e| e.0), Some(500));
        assert_eq!(*manager.log.lock(), vec!["begin", "rollback"]);
    }

    #[test]
    fn test_rollback_failure_does_not_mask_error() {
        let manager = Arc::new(RecordingTransactionManager {
            fail_rollback: true,
            ..Default::default()
        });
        let account = transactional_account(manager.clone());

        let err = account.withdraw(500).unwrap_err();
        assert!(err.downcast_ref::<InsufficientFunds>().is_some());
        assert_eq!(*manager.log.lock(), vec!["begin", "rollback"]);
    }

    #[test]
    fn test_begin_failure_skips_call_and_rollback() {
        let manager = Arc::new(RecordingTransactionManager {
            fail_begin: true,
            ..Default::default()
        });
        let account = transactional_account(manager.clone());

        let err = account.withdraw(10).unwrap_err();
        assert_eq!(err.to_string(), "connection pool exhausted");
        assert_eq!(*manager.log.lock(), vec!["begin"]);
        assert!(!manager.is_active());
    }

    #[test]
    fn test_joins_existing_transaction() {
        let manager = Arc::new(RecordingTransactionManager::default());
        let account = transactional_account(manager.clone());

        manager.begin().unwrap();
        manager.log.lock().clear();

        assert!(account.withdraw(500).is_err());
        assert_eq!(account.withdraw(10).unwrap(), 90);
        assert!(manager.log.lock().is_empty());
        assert!(manager.is_active());
    }

    #[test]
    fn test_unmarked_method_runs_without_transaction() {
        let manager = Arc::new(RecordingTransactionManager::default());
        let account = transactional_account(manager.clone());

        assert_eq!(account.owner().unwrap(), "alice");
        assert!(manager.log.lock().is_empty());
    }

    #[test]
    fn test_local_transaction_manager() {
        let manager = LocalTransactionManager::new();
        assert!(!manager.is_active());

        manager.begin().unwrap();
        assert!(manager.is_active());
        // 重复开启只告警
        manager.begin().unwrap();
        assert!(manager.is_active());

        manager.commit().unwrap();
        assert!(!manager.is_active());

        // 没有活动事务时提交、回滚只告警
        manager.commit().unwrap();
        manager.rollback().unwrap();
        assert!(!manager.is_active());
    }

    #[test]
    fn test_local_transactions_are_per_thread_and_per_manager() {
        let manager = Arc::new(LocalTransactionManager::new());
        let other = LocalTransactionManager::new();
        manager.begin().unwrap();

        assert!(!other.is_active());

        let shared = Arc::clone(&manager);
        let seen = std::thread::spawn(move || shared.is_active()).join().unwrap();
        assert!(!seen);
        assert!(manager.is_active());

        manager.rollback().unwrap();
        assert!(!manager.is_active());
    }

    #[test]
    fn test_concurrent_transactions_do_not_interfere() {
        let manager: Arc<dyn TransactionManager> = Arc::new(LocalTransactionManager::new());
        let account = transactional_account(Arc::clone(&manager));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let account = Arc::clone(&account);
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    let amount = if i % 2 == 0 { 10 } else { 1_000 };
                    let result = account.withdraw(amount);
                    (i, result.is_ok(), manager.is_active())
                })
            })
            .collect();

        for handle in handles {
            let (i, ok, still_active) = handle.join().unwrap();
            assert_eq!(ok, i % 2 == 0);
            assert!(!still_active);
        }
    }
}
