use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::expressions::Expression;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// A parsed boot command: expressions in the order they are typed.
///
/// The sequence holds no runtime state and can be executed any number of
/// times, against any driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionSequence {
    expressions: Vec<Expression>,
}

impl ExpressionSequence {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self { expressions }
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.expressions.iter()
    }

    /// Collect every problem in the sequence without typing anything.
    pub fn validate(&self) -> Vec<Error> {
        self.expressions
            .iter()
            .filter_map(|expr| expr.validate().err())
            .collect()
    }

    /// Type the sequence on `driver`, strictly in order.
    ///
    /// Stops at the first error and returns it unchanged. Cancelling `cancel`
    /// interrupts a running wait and prevents any further expression from
    /// starting; either way the result is [`Error::Cancelled`]. The driver is
    /// flushed once more after the last expression.
    ///
    /// When the sequence stops early, whatever the driver still buffers is
    /// discarded, so the driver starts the next run empty.
    pub async fn execute<D>(&self, cancel: &CancellationToken, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        tracing::info!(expressions = self.len(), "typing boot command");
        if let Err(err) = self.type_all(cancel, driver).await {
            driver.discard();
            return Err(err);
        }
        tracing::info!("boot command typed");
        Ok(())
    }

    async fn type_all<D>(&self, cancel: &CancellationToken, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        for (index, expr) in self.expressions.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::debug!(index, "boot command cancelled");
                return Err(Error::Cancelled);
            }
            tracing::debug!(index, %expr, "executing");
            if let Err(err) = expr.execute(cancel, driver).await {
                tracing::debug!(index, %expr, error = %err, "boot command stopped");
                return Err(err);
            }
        }
        driver.flush().await
    }
}

impl<'a> IntoIterator for &'a ExpressionSequence {
    type Item = &'a Expression;
    type IntoIter = std::slice::Iter<'a, Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ExpressionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for expr in &self.expressions {
            expr.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::KeyAction;
    use crate::expressions::{Literal, Special};
    use crate::parser::parse_str;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    #[derive(Debug, PartialEq)]
    enum Call {
        Key(char, KeyAction),
        Special(String, KeyAction),
        Flush,
        Discard,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        fail_on: Option<char>,
    }

    #[async_trait(?Send)]
    impl Driver for Recorder {
        async fn send_key(&mut self, key: char, action: KeyAction) -> Result<()> {
            if self.fail_on == Some(key) {
                return Err(Error::transmit(anyhow::anyhow!("console went away")));
            }
            self.calls.push(Call::Key(key, action));
            Ok(())
        }

        async fn send_special(&mut self, name: &str, action: KeyAction) -> Result<()> {
            self.calls.push(Call::Special(name.to_string(), action));
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            self.calls.push(Call::Flush);
            Ok(())
        }

        fn discard(&mut self) {
            self.calls.push(Call::Discard);
        }
    }

    #[tokio::test]
    async fn test_executes_in_order_and_flushes() {
        let seq = parse_str("a<wait0>B<tabOn>").unwrap();
        let mut driver = Recorder::default();
        seq.execute(&CancellationToken::new(), &mut driver)
            .await
            .unwrap();
        assert_eq!(
            driver.calls,
            vec![
                Call::Key('a', KeyAction::Press),
                Call::Flush,
                Call::Key('B', KeyAction::Press),
                Call::Special("tab".into(), KeyAction::On),
                Call::Flush,
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_error() {
        let seq = parse_str("abc<enter>").unwrap();
        let mut driver = Recorder {
            fail_on: Some('b'),
            ..Default::default()
        };
        let err = seq
            .execute(&CancellationToken::new(), &mut driver)
            .await
            .unwrap_err();
        assert_eq!(
            err.transmit_cause().map(ToString::to_string).as_deref(),
            Some("console went away")
        );
        assert_eq!(
            driver.calls,
            vec![Call::Key('a', KeyAction::Press), Call::Discard]
        );
    }

    #[tokio::test]
    async fn test_cancel_during_wait() {
        let seq = parse_str("a<wait10>b").unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut driver = Recorder::default();
        let start = Instant::now();
        let err = seq.execute(&cancel, &mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(
            driver.calls,
            vec![Call::Key('a', KeyAction::Press), Call::Flush, Call::Discard]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let seq = parse_str("abc").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut driver = Recorder::default();
        assert!(matches!(
            seq.execute(&cancel, &mut driver).await,
            Err(Error::Cancelled)
        ));
        assert_eq!(driver.calls, vec![Call::Discard]);
    }

    #[test]
    fn test_validate_reports_every_unknown_special() {
        let seq = ExpressionSequence::new(vec![
            Expression::Special(Special::new("enter", KeyAction::Press)),
            Expression::Special(Special::new("hyper", KeyAction::Press)),
            Expression::Literal(Literal::new('x', KeyAction::Press)),
            Expression::Special(Special::new("meta", KeyAction::On)),
        ]);
        let errors = seq.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "special hyper not found");
    }

    #[test]
    fn test_display_reparses() {
        let seq = parse_str("root<enter><wait5><leftAltOn>x<leftAltOff><aOn>").unwrap();
        assert_eq!(parse_str(&seq.to_string()).unwrap(), seq);
    }

    #[test]
    fn test_display_of_built_sequence_parses() {
        let seq = ExpressionSequence::new(vec![
            Expression::Literal(Literal::new('<', KeyAction::Press)),
            Expression::Literal(Literal::new('a', KeyAction::Press)),
            Expression::Literal(Literal::new('>', KeyAction::Press)),
        ]);
        assert_eq!(seq.to_string(), "<<On><<Off>a>");
        assert_eq!(parse_str(&seq.to_string()).unwrap().len(), 4);
    }
}
