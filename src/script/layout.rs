//! Host-side view of the generated event struct
//!
//! The loader computes real offsets with `ffi.offsetof`. This module applies
//! the same C layout rules on the host so event memory can be filled in
//! without asking the runtime. Field order and widths come from the
//! properties, so both sides agree as long as they target the same platform.

use std::mem;

use crate::schema::{DataType, Property, PropertyId};

/// Native string cell: explicit length, then a pointer to the bytes
///
/// Not null-terminated; event payloads may contain embedded nulls.
#[repr(C)]
#[allow(dead_code)]
struct StringCell {
    length: i64,
    data: *const u8,
}

/// Size and alignment of the native storage for a data type
pub const fn native_size_align(data_type: DataType) -> (usize, usize) {
    match data_type {
        DataType::String => (mem::size_of::<StringCell>(), mem::align_of::<StringCell>()),
        DataType::Integer => (mem::size_of::<i32>(), mem::align_of::<i32>()),
        DataType::Float => (mem::size_of::<f64>(), mem::align_of::<f64>()),
        DataType::Boolean => (mem::size_of::<bool>(), mem::align_of::<bool>()),
    }
}

/// One field of the event struct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub id: PropertyId,
    pub data_type: DataType,
    /// Byte offset from the start of the struct
    pub offset: usize,
    pub size: usize,
    pub align: usize,
}

/// Layout of the whole event struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLayout {
    fields: Vec<FieldLayout>,
    size: usize,
    align: usize,
}

impl EventLayout {
    /// Lay out the properties in the given order
    pub fn compute(properties: &[&Property]) -> Self {
        let mut fields = Vec::with_capacity(properties.len());
        let mut offset = 0;
        let mut struct_align = 1;

        for property in properties {
            let (size, align) = native_size_align(property.data_type());
            offset = align_up(offset, align);
            fields.push(FieldLayout {
                id: property.id(),
                data_type: property.data_type(),
                offset,
                size,
                align,
            });
            offset += size;
            struct_align = struct_align.max(align);
        }

        EventLayout {
            fields,
            size: align_up(offset, struct_align),
            align: struct_align,
        }
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Find a field by property id
    pub fn field(&self, id: PropertyId) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Total struct size including tail padding
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }
}

#[inline]
const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
