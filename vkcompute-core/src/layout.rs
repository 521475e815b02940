#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    StorageBuffer,
}

/// One slot of the kernel's binding interface. Every binding is visible to
/// the compute stage only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub kind: DescriptorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutDescriptor {
    pub bindings: Vec<DescriptorBinding>,
}

impl LayoutDescriptor {
    /// Binding 0 is the input buffer, binding 1 the output buffer.
    pub fn storage_pair() -> Self {
        Self {
            bindings: vec![
                DescriptorBinding { binding: 0, kind: DescriptorKind::StorageBuffer },
                DescriptorBinding { binding: 1, kind: DescriptorKind::StorageBuffer },
            ],
        }
    }

    pub fn single_storage() -> Self {
        Self {
            bindings: vec![DescriptorBinding { binding: 0, kind: DescriptorKind::StorageBuffer }],
        }
    }

    /// Descriptor counts per kind for a pool holding exactly one set of this
    /// layout, in first-seen order.
    pub fn pool_sizes(&self) -> Vec<(DescriptorKind, u32)> {
        let mut sizes: Vec<(DescriptorKind, u32)> = Vec::new();
        for binding in &self.bindings {
            match sizes.iter_mut().find(|(kind, _)| *kind == binding.kind) {
                Some((_, count)) => *count += 1,
                None => sizes.push((binding.kind, 1)),
            }
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_pair_needs_two_storage_descriptors() {
        let layout = LayoutDescriptor::storage_pair();
        assert_eq!(layout.bindings.iter().map(|b| b.binding).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(layout.pool_sizes(), vec![(DescriptorKind::StorageBuffer, 2)]);
    }

    #[test]
    fn single_storage_pool_sizes() {
        let layout = LayoutDescriptor::single_storage();
        assert_eq!(layout.bindings.len(), 1);
        assert_eq!(layout.pool_sizes(), vec![(DescriptorKind::StorageBuffer, 1)]);
    }
}
