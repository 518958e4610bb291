use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::grading::GradeComponent;

/// Weighted mean of `(value, weight)` pairs. Zero weights are dropped and an
/// empty input averages to zero. Pairs that would overflow the running sums
/// are dropped too.
pub fn weighted_average<I>(pairs: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut weighted_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;
    for (value, weight) in pairs {
        if weight.is_zero() {
            continue;
        }
        let next = value
            .checked_mul(weight)
            .and_then(|product| weighted_sum.checked_add(product))
            .zip(total_weight.checked_add(weight));
        match next {
            Some((sum, total)) => {
                weighted_sum = sum;
                total_weight = total;
            }
            None => debug!(%value, %weight, "dropping pair that overflows the average"),
        }
    }
    if total_weight.is_zero() {
        return Decimal::ZERO;
    }
    weighted_sum
        .checked_div(total_weight)
        .unwrap_or(Decimal::ZERO)
}

/// Sum that skips any term which would overflow.
pub fn checked_total<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, |total, value| {
        total.checked_add(value).unwrap_or_else(|| {
            debug!(%value, "dropping term that overflows the total");
            total
        })
    })
}

pub fn component_average(components: &[GradeComponent]) -> Decimal {
    weighted_average(components.iter().map(|c| (c.value, c.coefficient)))
}

/// Rounds up at the hundredths: 13.001 becomes 13.01.
pub fn ceil_hundredths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity)
}

pub fn round_hundredths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_hundredths(value: Decimal) -> String {
    format!("{:.2}", round_hundredths(value))
}
