use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PremiumError {
    #[error("installment count must be positive")]
    InvalidInstallments,
    #[error("price must be a positive finite amount, got {0}")]
    InvalidPrice(f64),
    #[error("discount percent must be within [0, 100), got {0}")]
    InvalidDiscount(f64),
}

/// Smallest premium at or above the discounted price whose per-installment
/// amount is a whole multiple of 100.
///
/// The discounted price is first rounded up to the next multiple of 100, then
/// up again to the next multiple of `installments * 100` when needed, so
/// `result / installments` is always round money.
pub fn minimum_premium(
    price: f64,
    discount_percent: f64,
    installments: u32,
) -> Result<i64, PremiumError> {
    if installments == 0 {
        return Err(PremiumError::InvalidInstallments);
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(PremiumError::InvalidPrice(price));
    }
    if !discount_percent.is_finite() || !(0.0..100.0).contains(&discount_percent) {
        return Err(PremiumError::InvalidDiscount(discount_percent));
    }

    let discounted = price * (1.0 - discount_percent / 100.0);
    let rounded = (discounted / 100.0).ceil() as i64 * 100;

    let step = i64::from(installments) * 100;
    if rounded % step == 0 {
        Ok(rounded)
    } else {
        Ok((rounded / step + 1) * step)
    }
}

#[cfg(test)]
mod tests {
    use super::{minimum_premium, PremiumError};

    #[test]
    fn rounds_up_to_installment_multiple() {
        // 12000 - 15% = 10200, already a multiple of 100 but not of 4 * 100.
        assert_eq!(minimum_premium(12000.0, 15.0, 4).expect("valid input"), 10400);
    }

    #[test]
    fn keeps_value_already_on_installment_boundary() {
        assert_eq!(minimum_premium(10400.0, 0.0, 4).expect("valid input"), 10400);
        assert_eq!(minimum_premium(300.0, 0.0, 3).expect("valid input"), 300);
    }

    #[test]
    fn single_installment_rounds_to_next_hundred() {
        assert_eq!(minimum_premium(101.0, 0.0, 1).expect("valid input"), 200);
        assert_eq!(minimum_premium(99.5, 0.0, 1).expect("valid input"), 100);
    }

    #[test]
    fn result_is_divisible_and_never_below_discounted_price() {
        for price in [1.0, 87.3, 999.99, 10_200.0, 12_000.0, 145_678.55, 1_000_000.0] {
            for discount in [0.0, 5.0, 15.0, 33.3, 99.9] {
                for installments in [1_u32, 2, 3, 4, 6, 12] {
                    let value = minimum_premium(price, discount, installments)
                        .expect("sweep inputs are valid");
                    let step = i64::from(installments) * 100;
                    assert_eq!(value % step, 0, "price={price} discount={discount}");
                    let discounted = price * (1.0 - discount / 100.0);
                    assert!(value as f64 >= discounted, "price={price} discount={discount}");
                }
            }
        }
    }

    #[test]
    fn rejects_zero_installments() {
        assert_eq!(minimum_premium(1000.0, 0.0, 0), Err(PremiumError::InvalidInstallments));
    }

    #[test]
    fn rejects_non_positive_or_non_finite_price() {
        assert!(matches!(minimum_premium(0.0, 0.0, 1), Err(PremiumError::InvalidPrice(_))));
        assert!(matches!(minimum_premium(-10.0, 0.0, 1), Err(PremiumError::InvalidPrice(_))));
        assert!(matches!(
            minimum_premium(f64::NAN, 0.0, 1),
            Err(PremiumError::InvalidPrice(_))
        ));
    }

    #[test]
    fn rejects_discount_outside_range() {
        assert!(matches!(
            minimum_premium(1000.0, 100.0, 1),
            Err(PremiumError::InvalidDiscount(_))
        ));
        assert!(matches!(
            minimum_premium(1000.0, -1.0, 1),
            Err(PremiumError::InvalidDiscount(_))
        ));
    }
}
