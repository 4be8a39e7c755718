//! Chronologically sortable keys for pushed children.
//!
//! Eight characters of millisecond timestamp followed by twelve random
//! characters, drawn from an alphabet whose byte order matches its index
//! order. Keys generated within the same millisecond increment the random
//! suffix so they still sort in creation order.

use rand::Rng;

const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_millis: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&mut self, millis: i64) -> String {
        let duplicate = millis == self.last_millis;
        self.last_millis = millis;

        let mut id = String::with_capacity(20);
        let mut time_chars = [0u8; 8];
        let mut remaining = millis.max(0);
        for slot in time_chars.iter_mut().rev() {
            *slot = ALPHABET[(remaining % 64) as usize];
            remaining /= 64;
        }
        id.extend(time_chars.iter().map(|&b| b as char));

        if duplicate {
            // Carry the increment through the suffix.
            for digit in self.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            let mut rng = rand::thread_rng();
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        }
        id.extend(
            self.last_random
                .iter()
                .map(|&digit| ALPHABET[digit as usize] as char),
        );
        id
    }
}
