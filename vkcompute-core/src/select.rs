//! Selection rules for physical devices, queue families and memory types.
//!
//! These operate on plain data pulled out of the driver so they can be run
//! against stubbed device properties.

use crate::{ComputeError, ComputeResult};
use log::{debug, warn};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

pub const SELECTION_PROMPT: &str = "Select a device by index: ";
pub const INVALID_SELECTION: &str = "Invalid device index, please try again: ";

/// Picks the physical device to open.
///
/// A lone device is taken without touching `input`. With several devices the
/// user is prompted on `output` until a whitespace-separated token parses as
/// an in-range index. Each rejected token earns one re-prompt.
pub fn select_device_index<R: BufRead, W: Write>(
    names: &[String],
    input: &mut R,
    output: &mut W,
) -> ComputeResult<usize> {
    let count = match names.len() {
        0 => return Err(ComputeError::NoPhysicalDevices),
        1 => return Ok(0),
        count => count,
    };

    write_prompt(output, SELECTION_PROMPT)?;
    let mut pending: VecDeque<String> = VecDeque::new();
    loop {
        let token = match pending.pop_front() {
            Some(token) => token,
            None => {
                let mut line = String::new();
                let read = input
                    .read_line(&mut line)
                    .map_err(|e| ComputeError::BackendError(format!("Failed to read console input: {}", e)))?;
                if read == 0 {
                    return Err(ComputeError::InputClosed);
                }
                // Blank lines carry no token and are skipped without a prompt.
                pending.extend(line.split_whitespace().map(str::to_string));
                continue;
            }
        };

        match token.parse::<usize>() {
            Ok(index) if index < count => {
                debug!("Device {} chosen from console input", index);
                return Ok(index);
            }
            _ => {
                warn!("Rejected device selection {:?}", token);
                write_prompt(output, INVALID_SELECTION)?;
            }
        }
    }
}

fn write_prompt<W: Write>(output: &mut W, text: &str) -> ComputeResult<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|_| output.flush())
        .map_err(|e| ComputeError::BackendError(format!("Failed to write console prompt: {}", e)))
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct QueueFlags(pub u32);

impl QueueFlags {
    pub const GRAPHICS: Self = Self(1 << 0);
    pub const COMPUTE: Self = Self(1 << 1);
    pub const TRANSFER: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for QueueFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub flags: QueueFlags,
    pub queue_count: u32,
}

/// In-order scan for the first family with compute support and at least one
/// queue. When nothing matches the result is the number of families scanned,
/// which is not a valid family index.
pub fn scan_compute_queue_family(families: &[QueueFamily]) -> u32 {
    let mut index = 0u32;
    for family in families {
        if family.flags.contains(QueueFlags::COMPUTE) && family.queue_count > 0 {
            break;
        }
        index += 1;
    }
    index
}

pub fn find_compute_queue_family(families: &[QueueFamily]) -> ComputeResult<u32> {
    let index = scan_compute_queue_family(families);
    if index as usize >= families.len() {
        return Err(ComputeError::NoComputeQueueFamily);
    }
    Ok(index)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MemoryPropertyFlags(pub u32);

impl MemoryPropertyFlags {
    pub const DEVICE_LOCAL: Self = Self(1 << 0);
    pub const HOST_VISIBLE: Self = Self(1 << 1);
    pub const HOST_COHERENT: Self = Self(1 << 2);
    pub const HOST_CACHED: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MemoryPropertyFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryType {
    pub property_flags: MemoryPropertyFlags,
    pub heap_index: u32,
}

/// First memory type allowed by `type_bits` that the host can map without
/// explicit flushes.
pub fn find_host_coherent_memory_type(types: &[MemoryType], type_bits: u32) -> ComputeResult<u32> {
    let wanted = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
    types
        .iter()
        .enumerate()
        .take(32)
        .find(|(i, ty)| type_bits & (1 << i) != 0 && ty.property_flags.contains(wanted))
        .map(|(i, _)| i as u32)
        .ok_or(ComputeError::NoSuitableMemoryType)
}

/// Size of the heap backing memory type `type_index`.
pub fn memory_heap_size(types: &[MemoryType], heap_sizes: &[u64], type_index: u32) -> ComputeResult<u64> {
    let ty = types
        .get(type_index as usize)
        .ok_or(ComputeError::Generic("Memory type index out of range"))?;
    heap_sizes
        .get(ty.heap_index as usize)
        .copied()
        .ok_or(ComputeError::Generic("Memory type refers to a missing heap"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("GPU {}", i)).collect()
    }

    fn family(flags: QueueFlags, queue_count: u32) -> QueueFamily {
        QueueFamily { flags, queue_count }
    }

    fn memory(property_flags: MemoryPropertyFlags, heap_index: u32) -> MemoryType {
        MemoryType { property_flags, heap_index }
    }

    #[test]
    fn single_device_is_taken_without_prompt() {
        let mut input = Cursor::new("3\n");
        let mut output = Vec::new();
        let index = select_device_index(&names(1), &mut input, &mut output).unwrap();
        assert_eq!(index, 0);
        assert!(output.is_empty());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn no_devices() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = select_device_index(&[], &mut input, &mut output).unwrap_err();
        assert!(matches!(err, ComputeError::NoPhysicalDevices));
    }

    #[test]
    fn invalid_tokens_are_reprompted() {
        let mut input = Cursor::new("abc\n7\n-1\n\n2\n");
        let mut output = Vec::new();
        let index = select_device_index(&names(3), &mut input, &mut output).unwrap();
        assert_eq!(index, 2);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with(SELECTION_PROMPT));
        assert_eq!(printed.matches(INVALID_SELECTION).count(), 3);
    }

    #[test]
    fn tokens_on_one_line_are_judged_separately() {
        let mut input = Cursor::new("abc 7 2\n");
        let mut output = Vec::new();
        assert_eq!(select_device_index(&names(3), &mut input, &mut output).unwrap(), 2);

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches(INVALID_SELECTION).count(), 2);
    }

    #[test]
    fn blank_lines_do_not_reprompt() {
        let mut input = Cursor::new("\n   \n\t\n1\n");
        let mut output = Vec::new();
        assert_eq!(select_device_index(&names(2), &mut input, &mut output).unwrap(), 1);
        assert_eq!(String::from_utf8(output).unwrap(), SELECTION_PROMPT);
    }

    #[test]
    fn first_valid_token_on_a_line_wins() {
        let mut input = Cursor::new("0 1\n2\n");
        let mut output = Vec::new();
        assert_eq!(select_device_index(&names(3), &mut input, &mut output).unwrap(), 0);
        assert_eq!(String::from_utf8(output).unwrap(), SELECTION_PROMPT);
    }

    #[test]
    fn valid_first_token_needs_no_reprompt() {
        let mut input = Cursor::new(" 1 \n");
        let mut output = Vec::new();
        assert_eq!(select_device_index(&names(2), &mut input, &mut output).unwrap(), 1);
        assert_eq!(String::from_utf8(output).unwrap(), SELECTION_PROMPT);
    }

    #[test]
    fn closed_input_stops_the_prompt() {
        let mut input = Cursor::new("9\n");
        let mut output = Vec::new();
        let err = select_device_index(&names(2), &mut input, &mut output).unwrap_err();
        assert!(matches!(err, ComputeError::InputClosed));
    }

    #[test]
    fn compute_family_skips_empty_and_graphics_only() {
        let families = [
            family(QueueFlags::GRAPHICS, 1),
            family(QueueFlags::COMPUTE, 0),
            family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE, 4),
            family(QueueFlags::COMPUTE, 2),
        ];
        assert_eq!(scan_compute_queue_family(&families), 2);
        assert_eq!(find_compute_queue_family(&families).unwrap(), 2);
    }

    #[test]
    fn compute_family_as_last_entry() {
        let families = [family(QueueFlags::TRANSFER, 1), family(QueueFlags::COMPUTE, 1)];
        assert_eq!(scan_compute_queue_family(&families), 1);
    }

    #[test]
    fn missing_compute_family_leaves_counter_at_len() {
        let families = [family(QueueFlags::GRAPHICS, 1), family(QueueFlags::TRANSFER, 2)];
        assert_eq!(scan_compute_queue_family(&families), 2);
        assert!(matches!(
            find_compute_queue_family(&families),
            Err(ComputeError::NoComputeQueueFamily)
        ));
        assert!(find_compute_queue_family(&[]).is_err());
    }

    #[test]
    fn first_host_coherent_type_wins() {
        let types = [
            memory(MemoryPropertyFlags::DEVICE_LOCAL, 0),
            memory(MemoryPropertyFlags::HOST_VISIBLE, 1),
            memory(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT, 1),
            memory(
                MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT | MemoryPropertyFlags::HOST_CACHED,
                1,
            ),
        ];
        assert_eq!(find_host_coherent_memory_type(&types, u32::MAX).unwrap(), 2);
        assert_eq!(find_host_coherent_memory_type(&types, 0b1000).unwrap(), 3);
    }

    #[test]
    fn no_host_coherent_type_fails() {
        let types = [
            memory(MemoryPropertyFlags::DEVICE_LOCAL, 0),
            memory(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_CACHED, 1),
        ];
        assert!(matches!(
            find_host_coherent_memory_type(&types, u32::MAX),
            Err(ComputeError::NoSuitableMemoryType)
        ));

        let coherent = [memory(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT, 0)];
        assert!(find_host_coherent_memory_type(&coherent, 0b10).is_err());
    }

    #[test]
    fn heap_size_follows_heap_index() {
        let types = [
            memory(MemoryPropertyFlags::DEVICE_LOCAL, 0),
            memory(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT, 1),
        ];
        let heaps: [u64; 2] = [8 << 30, 256 << 20];
        assert_eq!(memory_heap_size(&types, &heaps, 1).unwrap(), 256 << 20);
        assert_eq!(memory_heap_size(&types, &heaps, 0).unwrap(), 8 << 30);
    }

    #[test]
    fn dangling_heap_index_is_an_error() {
        let types = [memory(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT, 3)];
        assert!(matches!(memory_heap_size(&types, &[1024], 0), Err(ComputeError::Generic(_))));
        assert!(memory_heap_size(&types, &[1024], 5).is_err());
    }
}
