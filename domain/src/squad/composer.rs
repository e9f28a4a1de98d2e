//! Squad composition
//!
//! Splits a member list into squads of a target size. The order is shuffled
//! every time, so the same lobby produces different squads on every run.

use crate::core::error::DomainError;
use rand::Rng;
use rand::seq::SliceRandom;

/// Partition `members` into squads of `size`.
///
/// The members are shuffled uniformly and sliced into consecutive groups of
/// `size`. A trailing group of exactly one member is folded into the previous
/// group instead of standing alone, so a squad holds at most `size + 1`
/// members and never a single member while another squad exists.
///
/// # Example
///
/// ```
/// use squad_domain::squad::compose_squads;
///
/// let members: Vec<u32> = (0..9).collect();
/// let squads = compose_squads(&members, 4, &mut rand::thread_rng()).unwrap();
/// let sizes: Vec<usize> = squads.iter().map(Vec::len).collect();
/// assert_eq!(sizes, vec![4, 5]);
/// ```
pub fn compose_squads<T, R>(members: &[T], size: usize, rng: &mut R) -> Result<Vec<Vec<T>>, DomainError>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if members.len() < 2 {
        return Err(DomainError::InsufficientMembers(members.len()));
    }
    if size == 0 {
        return Err(DomainError::InvalidGroupSize);
    }

    let mut shuffled = members.to_vec();
    shuffled.shuffle(rng);

    let mut squads: Vec<Vec<T>> = shuffled.chunks(size).map(<[T]>::to_vec).collect();

    if squads.len() > 1
        && squads.last().is_some_and(|s| s.len() == 1)
        && let Some(mut leftover) = squads.pop()
        && let Some(previous) = squads.last_mut()
    {
        previous.append(&mut leftover);
    }

    Ok(squads)
}
