use serde::{Deserialize, Serialize};

/// Persistent per-user totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub points: u64,
    pub total_quizzes: u64,
    pub referral_code: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let referral_code = referral_code_for(&id);
        Self {
            id,
            name: name.into(),
            points: 0,
            total_quizzes: 0,
            referral_code,
        }
    }
}

/// Stable, shareable code derived from the user id
pub fn referral_code_for(id: &str) -> String {
    let stem: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    // FNV-1a, so the code stays the same across runs and platforms
    let hash = id.bytes().fold(0x811c_9dc5_u32, |h, b| {
        (h ^ b as u32).wrapping_mul(0x0100_0193)
    });
    format!("{}{:04X}", stem, hash & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_empty() {
        let user = User::new("u1", "Ada");
        assert_eq!(user.points, 0);
        assert_eq!(user.total_quizzes, 0);
        assert_eq!(user.name, "Ada");
        assert!(user.referral_code.starts_with("U1"));
    }

    #[test]
    fn referral_code_is_stable() {
        assert_eq!(referral_code_for("player-one"), referral_code_for("player-one"));
        assert_ne!(referral_code_for("player-one"), referral_code_for("player-two"));
    }
}
