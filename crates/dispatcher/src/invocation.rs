//! 元素动作调用与超时竞争
//!
//! 动作在独立的tokio任务中运行，调度器在三者之间竞争：
//! 完成通道、任务本身的返回、截止时间。超时后任务不会被中止，
//! 而是被分离继续运行，它之后交付的结果会被丢弃。

use std::any::Any;
use std::time::Duration;

use elements_core::models::ElementOutput;
use elements_core::traits::{Completion, Element};
use elements_core::ElementResult;
use tokio::task::JoinError;
use tokio::time::{sleep_until, timeout_at, Instant};

/// 单次动作调用的结局
#[derive(Debug)]
pub enum InvocationOutcome {
    /// 通过 `Completion::resolve` 交付
    Resolved(ElementOutput),
    /// 通过 `Completion::reject` 交付
    Rejected(anyhow::Error),
    /// `execute` 同步返回了 `Err`
    Fault(anyhow::Error),
    /// `execute` 发生panic
    Panicked(String),
    /// 完成句柄未交付结果就被丢弃
    Abandoned,
    TimedOut,
}

impl InvocationOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvocationOutcome::Fault(_) | InvocationOutcome::Panicked(_))
    }
}

/// 取出panic载荷中的文本
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn classify_return(joined: Result<ElementResult<()>, JoinError>) -> Option<InvocationOutcome> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(InvocationOutcome::Fault(e)),
        Err(e) if e.is_panic() => Some(InvocationOutcome::Panicked(panic_message(
            &*e.into_panic(),
        ))),
        Err(_) => Some(InvocationOutcome::Abandoned),
    }
}

/// 调用 `action` 并等待结果，最长等待 `timeout`
pub async fn invoke(element: Box<dyn Element>, action: String, timeout: Duration) -> InvocationOutcome {
    let deadline = Instant::now() + timeout;
    let (completion, mut receiver) = Completion::channel();
    let mut task = tokio::spawn(async move { element.execute(&action, completion).await });
    let mut returned = false;

    loop {
        tokio::select! {
            biased;

            settled = &mut receiver => {
                return match settled {
                    Ok(Ok(output)) => InvocationOutcome::Resolved(output),
                    Ok(Err(e)) => InvocationOutcome::Rejected(e),
                    // 句柄被丢弃：区分同步故障与单纯的遗弃
                    Err(_) if returned => InvocationOutcome::Abandoned,
                    Err(_) => match timeout_at(deadline, &mut task).await {
                        Ok(joined) => classify_return(joined).unwrap_or(InvocationOutcome::Abandoned),
                        Err(_) => InvocationOutcome::TimedOut,
                    },
                };
            }

            joined = &mut task, if !returned => {
                returned = true;
                if let Some(outcome) = classify_return(joined) {
                    return outcome;
                }
                // 动作已返回但句柄可能被转交给后台任务，继续等待
            }

            _ = sleep_until(deadline) => return InvocationOutcome::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use elements_core::models::RequestContext;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    enum Behavior {
        Resolve,
        Reject,
        Fail,
        Panic,
        Drop,
        Hang,
        Background,
        ObserveCancel(Arc<AtomicBool>),
    }

    struct StubElement(Behavior);

    #[async_trait]
    impl Element for StubElement {
        fn set_config(&mut self, _config: Value) -> ElementResult<()> {
            Ok(())
        }

        fn set_request(&mut self, _request: Arc<RequestContext>) {}

        fn has_action(&self, _action: &str) -> bool {
            true
        }

        async fn execute(&self, action: &str, mut completion: Completion) -> ElementResult<()> {
            match &self.0 {
                Behavior::Resolve => {
                    completion.resolve(json!({ "action": action }));
                }
                Behavior::Reject => {
                    completion.reject(anyhow::anyhow!("upstream unavailable"));
                }
                Behavior::Fail => anyhow::bail!("bad input"),
                Behavior::Panic => panic!("exploded"),
                Behavior::Drop => drop(completion),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Behavior::Background => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        completion.resolve(json!({ "late": true }));
                    });
                }
                Behavior::ObserveCancel(flag) => {
                    completion.cancelled().await;
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(())
        }
    }

    async fn run(behavior: Behavior, timeout_ms: u64) -> InvocationOutcome {
        invoke(
            Box::new(StubElement(behavior)),
            "executeTest".to_string(),
            Duration::from_millis(timeout_ms),
        )
        .await
    }

    #[tokio::test]
    async fn test_resolve_and_reject() {
        match run(Behavior::Resolve, 1000).await {
            InvocationOutcome::Resolved(output) => {
                assert_eq!(output.fields()["action"], "executeTest")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            run(Behavior::Reject, 1000).await,
            InvocationOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_sync_fault_and_panic_are_fatal() {
        let fault = run(Behavior::Fail, 1000).await;
        assert!(matches!(fault, InvocationOutcome::Fault(_)));
        assert!(fault.is_fatal());

        match run(Behavior::Panic, 1000).await {
            InvocationOutcome::Panicked(message) => assert!(message.contains("exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_completion_is_abandoned() {
        assert!(matches!(
            run(Behavior::Drop, 1000).await,
            InvocationOutcome::Abandoned
        ));
    }

    #[tokio::test]
    async fn test_completion_handed_to_background_task() {
        assert!(matches!(
            run(Behavior::Background, 1000).await,
            InvocationOutcome::Resolved(_)
        ));
    }

    #[tokio::test]
    async fn test_timeout_fires_within_tolerance() {
        let started = std::time::Instant::now();
        assert!(matches!(
            run(Behavior::Hang, 50).await,
            InvocationOutcome::TimedOut
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_timed_out_element_observes_cancellation() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(matches!(
            run(Behavior::ObserveCancel(flag.clone()), 30).await,
            InvocationOutcome::TimedOut
        ));
        for _ in 0..50 {
            if flag.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(flag.load(Ordering::SeqCst));
    }
}
