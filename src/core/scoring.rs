use crate::core::error::ScoreError;
use crate::models::{MissingAttribute, Ticket};

/// Compute match quality as the spread of one numeric attribute
///
/// quality = max(attribute) - min(attribute)
///
/// A lower value means a tighter skill band. The result does not depend on
/// ticket order and is `0.0` for a single ticket or a uniform group.
pub fn compute_quality(
    tickets: &[Ticket],
    attribute: &str,
    missing: MissingAttribute,
) -> Result<f64, ScoreError> {
    if tickets.is_empty() {
        return Err(ScoreError::EmptyGroup);
    }

    let mut high = f64::NEG_INFINITY;
    let mut low = f64::INFINITY;

    for ticket in tickets {
        let value = attribute_value(ticket, attribute, missing)?;
        high = high.max(value);
        low = low.min(value);
    }

    Ok(high - low)
}

#[inline]
fn attribute_value(
    ticket: &Ticket,
    attribute: &str,
    missing: MissingAttribute,
) -> Result<f64, ScoreError> {
    match (ticket.double_arg(attribute), missing) {
        (Some(value), _) => Ok(value),
        (None, MissingAttribute::Zero) => Ok(0.0),
        (None, MissingAttribute::Reject) => Err(ScoreError::MissingAttribute {
            ticket_id: ticket.id.clone(),
            attribute: attribute.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: &str, score: f64) -> Ticket {
        Ticket::new(id).with_double("score", score)
    }

    #[test]
    fn test_spread() {
        let tickets = vec![ticket("a", 10.0), ticket("b", 20.0), ticket("d", 5.0)];
        let quality = compute_quality(&tickets, "score", MissingAttribute::Reject).unwrap();
        assert_eq!(quality, 15.0);
    }

    #[test]
    fn test_single_ticket_is_zero() {
        let quality = compute_quality(&[ticket("a", 3923.0)], "score", MissingAttribute::Reject).unwrap();
        assert_eq!(quality, 0.0);
    }

    #[test]
    fn test_uniform_group_is_zero() {
        let tickets = vec![ticket("a", 7.5), ticket("b", 7.5), ticket("c", 7.5)];
        assert_eq!(compute_quality(&tickets, "score", MissingAttribute::Reject).unwrap(), 0.0);
    }

    #[test]
    fn test_order_independent() {
        let forward = vec![ticket("a", 1.0), ticket("b", 9.0), ticket("c", 4.0)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let q1 = compute_quality(&forward, "score", MissingAttribute::Reject).unwrap();
        let q2 = compute_quality(&reversed, "score", MissingAttribute::Reject).unwrap();
        assert_eq!(q1, q2);
    }

    #[test]
    fn test_negative_values() {
        // A zero-initialized high watermark would get this wrong
        let tickets = vec![ticket("a", -10.0), ticket("b", -4.0)];
        assert_eq!(compute_quality(&tickets, "score", MissingAttribute::Reject).unwrap(), 6.0);
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = compute_quality(&[], "score", MissingAttribute::Zero);
        assert_eq!(result, Err(ScoreError::EmptyGroup));
    }

    #[test]
    fn test_missing_attribute_rejected() {
        let tickets = vec![ticket("a", 10.0), Ticket::new("b")];
        let result = compute_quality(&tickets, "score", MissingAttribute::Reject);
        assert_eq!(
            result,
            Err(ScoreError::MissingAttribute {
                ticket_id: "b".to_string(),
                attribute: "score".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_attribute_as_zero() {
        let tickets = vec![ticket("a", 10.0), Ticket::new("b")];
        let quality = compute_quality(&tickets, "score", MissingAttribute::Zero).unwrap();
        assert_eq!(quality, 10.0);
    }
}
