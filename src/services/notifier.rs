use async_trait::async_trait;

/// Summary handed to the notifier after a payment lands.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment_code: String,
    pub movie_title: String,
    pub seat_numbers: Vec<String>,
    pub total_price: i64,
}

/// Outbound payment-confirmation channel. Strictly best-effort: the LUNAS
/// transition has already committed by the time this runs, so failures are
/// logged by the caller and never propagated.
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    async fn send_payment_confirmation(
        &self,
        recipient: &str,
        confirmation: &PaymentConfirmation,
    ) -> anyhow::Result<()>;
}

/// Default notifier: writes the confirmation to the log. Mail/push delivery
/// lives outside this service.
pub struct LogNotifier;

#[async_trait]
impl PaymentNotifier for LogNotifier {
    async fn send_payment_confirmation(
        &self,
        recipient: &str,
        confirmation: &PaymentConfirmation,
    ) -> anyhow::Result<()> {
        tracing::info!(
            recipient,
            payment_code = %confirmation.payment_code,
            movie = %confirmation.movie_title,
            seats = ?confirmation.seat_numbers,
            total_price = confirmation.total_price,
            "payment confirmed"
        );
        Ok(())
    }
}
