//! Console first-sighting notifications

use can_monitor_core::{FirstSighting, SightingObserver};

/// Prints a banner for every newly detected message type
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl SightingObserver for ConsoleObserver {
    fn on_first_sighting(&mut self, sighting: &FirstSighting) {
        println!("\n=== New CAN Message Detected ===");
        println!(
            "Message: {} (ID=0x{:X}, DLC={})",
            sighting.message_name, sighting.arbitration_id, sighting.byte_length
        );
        println!("{}", "=".repeat(30));
    }
}
