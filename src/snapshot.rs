//! In-memory heap snapshot
//!
//! [`HeapSnapshot`] is the [`HeapGraph`] the command-line driver loads. It is
//! built either programmatically or from a JSON snapshot document exported by
//! a heap-dump decoder:
//!
//! ```json
//! {
//!   "classes": [
//!     {"id": 1, "name": "java.lang.String",
//!      "fields": [{"name": "value", "type": "object"}, {"name": "hash", "type": "int"}]}
//!   ],
//!   "instances": [
//!     {"id": 100, "class": 1,
//!      "fields": [{"name": "value", "value": {"ref": 200}}, {"name": "hash", "value": {"int": 0}}]}
//!   ],
//!   "arrays": [
//!     {"id": 200, "elements": {"char": [104, 105]}}
//!   ]
//! }
//! ```
//!
//! A field value may name its declaring class with `"declared_by": <class id>`.
//! Without it the field is resolved by walking the instance's class hierarchy
//! from the most derived class upwards.

use crate::decode::JAVA_LANG_STRING;
use crate::graph::{
    ClassDescriptor, FieldDescriptor, FieldType, FieldValue, HeapGraph, InstanceId, PrimitiveArray,
};
use anyhow::{bail, Context, Result};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Identity of a class inside a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u64);

#[derive(Debug, Clone)]
struct ClassEntry {
    descriptor: ClassDescriptor,
    superclass: Option<ClassId>,
}

#[derive(Debug, Clone)]
struct StoredField {
    declaring_class: ClassId,
    name: String,
    value: FieldValue,
}

#[derive(Debug, Clone)]
struct InstanceEntry {
    id: InstanceId,
    class: ClassId,
    fields: Vec<StoredField>,
}

/// Ids at or above this value are refused when loading a document
const MAX_DOCUMENT_ID: u64 = u64::MAX - 1;

/// Heap graph held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct HeapSnapshot {
    classes: FnvHashMap<ClassId, ClassEntry>,
    /// Class ids in insertion order, for stable serialization
    class_order: Vec<ClassId>,
    instances: Vec<InstanceEntry>,
    instance_index: FnvHashMap<InstanceId, usize>,
    arrays: FnvHashMap<InstanceId, PrimitiveArray>,
    array_order: Vec<InstanceId>,
    next_class_id: u64,
    next_object_id: u64,
    string_class: Option<ClassId>,
}

impl HeapSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self {
            next_class_id: 1,
            next_object_id: 1,
            ..Self::default()
        }
    }

    /// Load a JSON snapshot document from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Heap dump not found: {}", path.display());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open heap dump: {}", path.display()))?;

        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat heap dump: {}", path.display()))?
            .len();
        if len == 0 {
            bail!("Heap dump is empty: {}", path.display());
        }

        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map heap dump: {}", path.display()))?;

        let snapshot = Self::from_json_slice(&mmap)
            .with_context(|| format!("Failed to read heap dump: {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            classes = snapshot.class_count(),
            instances = snapshot.instance_count(),
            arrays = snapshot.arrays.len(),
            "loaded heap snapshot"
        );
        Ok(snapshot)
    }

    /// Parse a JSON snapshot document
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let document: SnapshotDocument =
            serde_json::from_slice(bytes).context("Invalid snapshot document")?;
        Self::from_document(document)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_json_slice(content.as_bytes())
    }

    /// Serialize back into the JSON snapshot document format
    pub fn to_json_string(&self) -> Result<String> {
        let document = self.to_document()?;
        serde_json::to_string_pretty(&document).context("Failed to serialize snapshot")
    }

    fn from_document(document: SnapshotDocument) -> Result<Self> {
        let mut snapshot = Self::new();

        for record in &document.classes {
            let id = ClassId(record.id);
            if record.id > MAX_DOCUMENT_ID {
                bail!("Class id {} is out of range", record.id);
            }
            if snapshot.classes.contains_key(&id) {
                bail!("Duplicate class id {}", record.id);
            }
            let fields = record
                .fields
                .iter()
                .map(|f| FieldDescriptor {
                    name: f.name.clone(),
                    declaring_class: record.name.clone(),
                    field_type: f.field_type,
                })
                .collect();
            snapshot.insert_class(
                id,
                ClassEntry {
                    descriptor: ClassDescriptor {
                        name: record.name.clone(),
                        fields,
                    },
                    superclass: record.superclass.map(ClassId),
                },
            );
        }

        for record in &document.classes {
            if let Some(parent) = record.superclass {
                if !snapshot.classes.contains_key(&ClassId(parent)) {
                    bail!(
                        "Class {} ({}) has unknown superclass {}",
                        record.id,
                        record.name,
                        parent
                    );
                }
            }
        }

        for record in document.arrays {
            if record.id.0 > MAX_DOCUMENT_ID {
                bail!("Array id {} is out of range", record.id.0);
            }
            if snapshot.arrays.contains_key(&record.id) {
                bail!("Duplicate array id {}", record.id.0);
            }
            snapshot.insert_array(record.id, record.elements);
        }

        for record in document.instances {
            if record.id.0 > MAX_DOCUMENT_ID {
                bail!("Instance id {} is out of range", record.id.0);
            }
            if snapshot.instance_index.contains_key(&record.id)
                || snapshot.arrays.contains_key(&record.id)
            {
                bail!("Duplicate instance id {}", record.id.0);
            }
            let class = ClassId(record.class);
            if !snapshot.classes.contains_key(&class) {
                bail!("Instance {} has unknown class {}", record.id.0, record.class);
            }
            let mut fields = Vec::with_capacity(record.fields.len());
            for value in record.fields {
                let declaring_class = match value.declared_by.map(ClassId) {
                    Some(declared_by) if snapshot.classes.contains_key(&declared_by) => {
                        declared_by
                    }
                    Some(declared_by) => bail!(
                        "Instance {} field {} declared by unknown class {}",
                        record.id.0,
                        value.name,
                        declared_by.0
                    ),
                    None => snapshot.resolve_declaring_class(class, &value.name),
                };
                fields.push(StoredField {
                    declaring_class,
                    name: value.name,
                    value: value.value,
                });
            }
            snapshot.insert_instance(InstanceEntry {
                id: record.id,
                class,
                fields,
            });
        }

        Ok(snapshot)
    }

    fn to_document(&self) -> Result<SnapshotDocument> {
        let mut classes = Vec::with_capacity(self.class_order.len());
        for id in &self.class_order {
            let Some(entry) = self.classes.get(id) else {
                bail!("Class {} is missing from the snapshot", id.0);
            };
            classes.push(ClassRecord {
                id: id.0,
                name: entry.descriptor.name.clone(),
                superclass: entry.superclass.map(|c| c.0),
                fields: entry
                    .descriptor
                    .fields
                    .iter()
                    .map(|f| FieldRecord {
                        name: f.name.clone(),
                        field_type: f.field_type,
                    })
                    .collect(),
            });
        }

        let mut instances = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            if !self.classes.contains_key(&instance.class) {
                bail!(
                    "Instance {} has unknown class {}",
                    instance.id.0,
                    instance.class.0
                );
            }
            instances.push(InstanceRecord {
                id: instance.id,
                class: instance.class.0,
                fields: instance
                    .fields
                    .iter()
                    .map(|f| ValueRecord {
                        declared_by: (f.declaring_class != instance.class)
                            .then_some(f.declaring_class.0),
                        name: f.name.clone(),
                        value: f.value,
                    })
                    .collect(),
            });
        }

        let mut arrays = Vec::with_capacity(self.array_order.len());
        for id in &self.array_order {
            let Some(elements) = self.arrays.get(id) else {
                bail!("Array {} is missing from the snapshot", id.0);
            };
            arrays.push(ArrayRecord {
                id: *id,
                elements: elements.clone(),
            });
        }

        Ok(SnapshotDocument {
            classes,
            instances,
            arrays,
        })
    }

    /// Declare a class with no superclass
    pub fn add_class(&mut self, name: &str, fields: &[(&str, FieldType)]) -> ClassId {
        self.add_class_entry(name, None, fields)
    }

    /// Declare a class extending `superclass`; `fields` are the ones it declares itself
    pub fn add_subclass(
        &mut self,
        name: &str,
        superclass: ClassId,
        fields: &[(&str, FieldType)],
    ) -> ClassId {
        self.add_class_entry(name, Some(superclass), fields)
    }

    fn add_class_entry(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        fields: &[(&str, FieldType)],
    ) -> ClassId {
        let id = ClassId(self.next_class_id);
        let fields = fields
            .iter()
            .map(|(field_name, field_type)| FieldDescriptor {
                name: field_name.to_string(),
                declaring_class: name.to_string(),
                field_type: *field_type,
            })
            .collect();
        self.insert_class(
            id,
            ClassEntry {
                descriptor: ClassDescriptor {
                    name: name.to_string(),
                    fields,
                },
                superclass,
            },
        );
        id
    }

    /// Add an instance of `class` with the given field values
    ///
    /// Each field is attributed to the nearest class in the hierarchy that
    /// declares a field of that name. `class` is not checked here; an unknown
    /// class makes [`HeapSnapshot::to_json_string`] fail.
    pub fn add_instance(&mut self, class: ClassId, values: &[(&str, FieldValue)]) -> InstanceId {
        let id = self.allocate_object_id();
        let fields = values
            .iter()
            .map(|(name, value)| StoredField {
                declaring_class: self.resolve_declaring_class(class, name),
                name: name.to_string(),
                value: *value,
            })
            .collect();
        self.insert_instance(InstanceEntry { id, class, fields });
        id
    }

    /// Set a field value, naming the declaring class explicitly
    ///
    /// Needed when a subclass shadows a superclass field of the same name.
    /// Returns `false` when the instance is unknown or no class of that name
    /// is in its hierarchy.
    pub fn set_field(
        &mut self,
        instance: InstanceId,
        declaring_class: &str,
        name: &str,
        value: FieldValue,
    ) -> bool {
        let Some(&pos) = self.instance_index.get(&instance) else {
            return false;
        };
        let Some(declaring_class) = self
            .hierarchy(self.instances[pos].class)
            .find(|(_, entry)| entry.descriptor.name == declaring_class)
            .map(|(id, _)| id)
        else {
            return false;
        };
        let fields = &mut self.instances[pos].fields;
        match fields
            .iter_mut()
            .find(|f| f.declaring_class == declaring_class && f.name == name)
        {
            Some(existing) => existing.value = value,
            None => fields.push(StoredField {
                declaring_class,
                name: name.to_string(),
                value,
            }),
        }
        true
    }

    /// Add a primitive array
    pub fn add_array(&mut self, elements: PrimitiveArray) -> InstanceId {
        let id = self.allocate_object_id();
        self.insert_array(id, elements);
        id
    }

    /// Add a `java.lang.String` backed by a `char[]` holding `text`
    pub fn add_string(&mut self, text: &str) -> InstanceId {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.add_string_from_chars(&units)
    }

    /// Add a `java.lang.String` backed by a `char[]` of raw UTF-16 code units
    pub fn add_string_from_chars(&mut self, units: &[u16]) -> InstanceId {
        let class = match self.string_class {
            Some(class) => class,
            None => {
                let class = self.add_class(
                    JAVA_LANG_STRING,
                    &[("value", FieldType::Object), ("hash", FieldType::Int)],
                );
                self.string_class = Some(class);
                class
            }
        };
        let array = self.add_array(PrimitiveArray::Char(units.to_vec()));
        self.add_instance(
            class,
            &[
                ("value", FieldValue::Reference(array)),
                ("hash", FieldValue::Int(0)),
            ],
        )
    }

    /// Superclass of a class, if any
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.classes.get(&class).and_then(|c| c.superclass)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of object instances (primitive arrays excluded)
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn insert_class(&mut self, id: ClassId, entry: ClassEntry) {
        if entry.descriptor.name == JAVA_LANG_STRING && self.string_class.is_none() {
            self.string_class = Some(id);
        }
        self.classes.insert(id, entry);
        self.class_order.push(id);
        self.next_class_id = self.next_class_id.max(id.0.saturating_add(1));
    }

    fn insert_instance(&mut self, entry: InstanceEntry) {
        self.next_object_id = self.next_object_id.max(entry.id.0.saturating_add(1));
        self.instance_index.insert(entry.id, self.instances.len());
        self.instances.push(entry);
    }

    fn insert_array(&mut self, id: InstanceId, elements: PrimitiveArray) {
        self.next_object_id = self.next_object_id.max(id.0.saturating_add(1));
        self.arrays.insert(id, elements);
        self.array_order.push(id);
    }

    fn allocate_object_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_object_id);
        self.next_object_id = self.next_object_id.saturating_add(1);
        id
    }

    /// `class` followed by its superclasses, most derived first
    fn hierarchy(&self, class: ClassId) -> impl Iterator<Item = (ClassId, &ClassEntry)> + '_ {
        let mut current = Some(class);
        // Bounded so a cyclic superclass chain cannot hang
        (0..=self.classes.len()).map_while(move |_| {
            let id = current?;
            let entry = self.classes.get(&id)?;
            current = entry.superclass;
            Some((id, entry))
        })
    }

    /// Nearest class in the hierarchy of `class` that declares `field`,
    /// falling back to `class` itself
    fn resolve_declaring_class(&self, class: ClassId, field: &str) -> ClassId {
        self.hierarchy(class)
            .find(|(_, entry)| entry.descriptor.field(field).is_some())
            .map_or(class, |(id, _)| id)
    }
}

impl HeapGraph for HeapSnapshot {
    fn instances(&self) -> Box<dyn Iterator<Item = InstanceId> + '_> {
        Box::new(self.instances.iter().map(|i| i.id))
    }

    fn class_of(&self, instance: InstanceId) -> Option<&ClassDescriptor> {
        let pos = *self.instance_index.get(&instance)?;
        self.classes
            .get(&self.instances[pos].class)
            .map(|c| &c.descriptor)
    }

    fn field_value(&self, instance: InstanceId, field: &FieldDescriptor) -> Option<FieldValue> {
        let pos = *self.instance_index.get(&instance)?;
        self.instances[pos]
            .fields
            .iter()
            .find(|f| {
                f.name == field.name
                    && self.classes.get(&f.declaring_class).is_some_and(|entry| {
                        entry.descriptor.name == field.declaring_class
                    })
            })
            .map(|f| f.value)
    }

    fn primitive_array(&self, array: InstanceId) -> Option<&PrimitiveArray> {
        self.arrays.get(&array)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    classes: Vec<ClassRecord>,
    #[serde(default)]
    instances: Vec<InstanceRecord>,
    #[serde(default)]
    arrays: Vec<ArrayRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassRecord {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    superclass: Option<u64>,
    #[serde(default)]
    fields: Vec<FieldRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldRecord {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

#[derive(Debug, Serialize, Deserialize)]
struct InstanceRecord {
    id: InstanceId,
    class: u64,
    #[serde(default)]
    fields: Vec<ValueRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    declared_by: Option<u64>,
    name: String,
    value: FieldValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArrayRecord {
    id: InstanceId,
    elements: PrimitiveArray,
}
