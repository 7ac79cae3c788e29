use std::sync::Arc;
use tracing::{debug, info, warn};

use charge_common::models::coupon::coupon_clock;
use charge_common::models::{
    CouponStatus, CreatedCoupon, NewCoupon, RedeemRequest, RedeemResult, Redemption,
};
use charge_common::traits::repository_traits::CouponRepository;
use crate::Error;

pub struct CouponService {
    repo: Arc<dyn CouponRepository>,
}

/// The error a non-redeemable status maps to, or `None` for `available`.
fn status_error(status: &CouponStatus) -> Option<Error> {
    match status {
        CouponStatus::Available => None,
        CouponStatus::Expired => Some(Error::CouponExpired),
        CouponStatus::Used => Some(Error::CouponUsed),
        CouponStatus::Unknown(_) => Some(Error::CouponUnavailable),
    }
}

impl CouponService {
    pub fn new(repo: Arc<dyn CouponRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_coupon(&self, coupon: NewCoupon) -> Result<CreatedCoupon, Error> {
        let coupon = coupon.normalized();
        if coupon.serial.trim().is_empty() || coupon.code.trim().is_empty() {
            return Err(Error::Validation("serial and code are required".into()));
        }

        self.repo.insert_coupon(&coupon).await?;
        info!("created coupon serial={} code={}", coupon.serial, coupon.code);

        Ok(CreatedCoupon { serial: coupon.serial, code: coupon.code })
    }

    /// Redeems a coupon and returns its amount.
    ///
    /// The stored status is checked before the expiration: a coupon that is
    /// already `used` or `expired` is rejected without any write. An
    /// `available` coupon past its expiration is flipped to `expired`.
    pub async fn redeem_coupon(&self, request: RedeemRequest) -> Result<RedeemResult, Error> {
        let serial = request.serial.to_lowercase();
        let code = request.code.to_lowercase();

        let state = self
            .repo
            .fetch_redeem_state(&serial, &code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("coupon serial='{}' code='{}'", serial, code)))?;
        debug!(
            "expiration={}, amount={}, status={}",
            state.expiration, state.amount, state.status
        );

        if let Some(err) = status_error(&state.status) {
            return Err(err);
        }

        let use_time = coupon_clock(request.use_time);
        if use_time > state.expiration {
            if !self.repo.mark_expired(&serial, &code).await? {
                warn!("coupon serial={} code={} changed before it could be expired", serial, code);
                return Err(self
                    .repo
                    .fetch_redeem_state(&serial, &code)
                    .await?
                    .and_then(|s| status_error(&s.status))
                    .unwrap_or(Error::CouponExpired));
            }
            info!("coupon serial={} code={} expired at {}", serial, code, state.expiration);
            return Err(Error::CouponExpired);
        }

        let redemption = Redemption {
            serial,
            code,
            username: request.username,
            namespace: request.namespace,
            use_time,
        };

        if !self.repo.mark_used(&redemption).await? {
            // Someone else changed the row between our read and write.
            let current = self
                .repo
                .fetch_redeem_state(&redemption.serial, &redemption.code)
                .await?;
            warn!(
                "lost redemption race for serial={} code={}",
                redemption.serial, redemption.code
            );
            return Err(current
                .and_then(|s| status_error(&s.status))
                .unwrap_or(Error::CouponUnavailable));
        }

        info!(
            "coupon serial={} code={} used by {}/{}",
            redemption.serial, redemption.code, redemption.namespace, redemption.username
        );
        Ok(RedeemResult { amount: state.amount })
    }
}
