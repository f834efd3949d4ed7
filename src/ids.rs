const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const SHORT_ID_LEN: usize = 22;

/// Generate a 22 character base57 id from a random UUID.
///
/// The alphabet drops visually ambiguous characters (`0`, `1`, `I`, `O`, `l`),
/// so ids are safe to read back from logs or URLs.
pub fn short_id() -> String {
    encode(uuid::Uuid::new_v4().as_u128())
}

fn encode(mut number: u128) -> String {
    let base = ALPHABET.len() as u128;
    let mut digits = Vec::with_capacity(SHORT_ID_LEN);
    while number > 0 {
        digits.push(ALPHABET[(number % base) as usize]);
        number /= base;
    }
    while digits.len() < SHORT_ID_LEN {
        digits.push(ALPHABET[0]);
    }
    digits.reverse();
    // Alphabet is ASCII, every byte is a valid char.
    digits.into_iter().map(char::from).collect()
}
