use crate::error::ClientError;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a human SOL amount to lamports, rounding to the nearest lamport.
pub fn sol_to_lamports(sol: f64) -> Result<u64, ClientError> {
    if !sol.is_finite() || sol < 0.0 {
        return Err(ClientError::InvalidAmount(format!("{sol} SOL")));
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    if lamports > u64::MAX as f64 {
        return Err(ClientError::InvalidAmount(format!("{sol} SOL overflows u64 lamports")));
    }
    Ok(lamports as u64)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_and_fractional_sol() {
        assert_eq!(sol_to_lamports(5.0).unwrap(), 5_000_000_000);
        assert_eq!(sol_to_lamports(0.000_000_001).unwrap(), 1);
        assert_eq!(sol_to_lamports(0.1).unwrap(), 100_000_000);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(sol_to_lamports(-1.0).is_err());
        assert!(sol_to_lamports(f64::NAN).is_err());
        assert!(sol_to_lamports(f64::INFINITY).is_err());
        assert!(sol_to_lamports(1e30).is_err());
    }

    #[test]
    fn lamports_back_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(lamports_to_sol(0), 0.0);
    }
}
