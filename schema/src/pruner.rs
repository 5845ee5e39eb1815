use std::collections::{HashMap, HashSet, VecDeque};

use crate::ident::IdentifierSet;
use crate::model::{FieldType, ProtoFile, Schema, Type};

/// The pruned schema plus diagnostics for rules that never matched anything.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneResult {
    pub schema:          Schema,
    pub unused_includes: Vec<String>,
    pub unused_excludes: Vec<String>,
}

/// Computes the subset of `schema` reachable from the identifier set's
/// include roots. Include rules match type, service, and member names
/// (`Type.field`, `Service.rpc`); a member-level include roots its enclosing
/// declaration restricted to that member. Traversal follows name edges
/// (field types, oneof member types, rpc request and response types) and
/// never descends into a node matched by an exclude rule; an excluded node
/// is dropped even if reachable. An empty identifier set is a no-op.
pub fn prune(schema: &Schema, set: &IdentifierSet) -> PruneResult {
    if set.is_empty() {
        return PruneResult {
            schema:          schema.clone(),
            unused_includes: Vec::new(),
            unused_excludes: Vec::new(),
        };
    }

    let mut marker = Marker {
        schema,
        set,
        used_includes: vec![false; set.includes().len()],
        used_excludes: vec![false; set.excludes().len()],
        marked: HashSet::new(),
        restricted: HashMap::new(),
        queue: VecDeque::new(),
    };

    marker.mark_roots();
    marker.mark_reachable();

    let retained = retain_marked(schema, set, &marker.marked, &marker.restricted);

    let unused_includes = unused_rules(set.includes(), &marker.used_includes);
    let unused_excludes = unused_rules(set.excludes(), &marker.used_excludes);

    PruneResult {
        schema: Schema::new(retained),
        unused_includes,
        unused_excludes,
    }
}

struct Marker<'s> {
    schema:        &'s Schema,
    set:           &'s IdentifierSet,
    used_includes: Vec<bool>,
    used_excludes: Vec<bool>,
    marked:        HashSet<String>,
    /// Declarations rooted only through member-level includes, mapped to
    /// their included member names. Lifted if the declaration is later
    /// reached in full through an edge.
    restricted:    HashMap<String, HashSet<String>>,
    queue:         VecDeque<String>,
}

impl<'s> Marker<'s> {
    /// Exclude is evaluated before inclusion on every node.
    fn excluded(&mut self, name: &str) -> bool {
        match self.set.matching_exclude(name) {
            Some(index) => {
                self.used_excludes[index] = true;
                true
            }
            None => false,
        }
    }

    fn mark_roots(&mut self) {
        let decls: Vec<(String, Vec<String>)> = self
            .schema
            .types()
            .map(|ty| {
                let members = match ty {
                    Type::Message(message) => message
                        .fields
                        .iter()
                        .map(|field| format!("{}.{}", message.name, field.name))
                        .collect(),
                    Type::Enum(_) => Vec::new(),
                };
                (ty.name().to_owned(), members)
            })
            .chain(self.schema.services().map(|service| {
                let members = service
                    .rpcs
                    .iter()
                    .map(|rpc| format!("{}.{}", service.name, rpc.name))
                    .collect();
                (service.name.clone(), members)
            }))
            .collect();

        for (name, members) in decls {
            if self.excluded(&name) {
                continue;
            }
            if self.set.includes_everything() {
                self.mark(name);
                continue;
            }
            if let Some(index) = self.set.matching_include(&name) {
                self.used_includes[index] = true;
                self.mark(name);
                continue;
            }
            // The declaration itself isn't a root; search for root members.
            let mut included = HashSet::new();
            for member in members {
                if let Some(index) = self.set.matching_include(&member) {
                    self.used_includes[index] = true;
                    included.insert(member);
                }
            }
            if !included.is_empty() {
                self.restricted.insert(name.clone(), included);
                self.mark(name);
            }
        }
    }

    fn mark(&mut self, name: String) {
        if self.marked.insert(name.clone()) {
            self.queue.push_back(name);
        } else if self.restricted.remove(&name).is_some() {
            // Rooted through a member earlier, now reached in full; revisit
            // to traverse the remaining member edges.
            self.queue.push_back(name);
        }
    }

    /// Mark everything transitively reachable from the queued roots.
    fn mark_reachable(&mut self) {
        while let Some(name) = self.queue.pop_front() {
            for target in self.edges(&name) {
                if self.excluded(&target) {
                    continue;
                }
                self.mark(target);
            }
        }
    }

    /// Reference edges out of a node. A field whose member name
    /// (`Type.field`) matches an exclude rule contributes no edge.
    fn edges(&mut self, name: &str) -> Vec<String> {
        let candidates: Vec<(String, Option<String>)> = match self.schema.get_type(name) {
            Some(Type::Message(message)) => message
                .fields
                .iter()
                .filter_map(|field| match &field.type_ {
                    FieldType::Named(target) => Some((
                        format!("{}.{}", message.name, field.name),
                        Some(target.clone()),
                    )),
                    _ => None,
                })
                .collect(),
            Some(Type::Enum(_)) => Vec::new(),
            None => match self.schema.get_service(name) {
                Some(service) => service
                    .rpcs
                    .iter()
                    .flat_map(|rpc| {
                        let member = format!("{}.{}", service.name, rpc.name);
                        [
                            (member.clone(), Some(rpc.request.clone())),
                            (member, Some(rpc.response.clone())),
                        ]
                    })
                    .collect(),
                None => Vec::new(),
            },
        };

        let restriction = self.restricted.get(name).cloned();
        let mut targets = Vec::new();
        for (member, target) in candidates {
            if let Some(allowed) = &restriction {
                if !allowed.contains(&member) {
                    continue;
                }
            }
            if self.excluded(&member) {
                continue;
            }
            if let Some(target) = target {
                targets.push(target);
            }
        }
        targets
    }
}

/// Rebuilds the file list keeping only marked types and services, dropping
/// exclude-matched members (and, for member-restricted roots, members outside
/// the restriction) from retained declarations, and dropping files left with
/// no content.
fn retain_marked(
    schema: &Schema,
    set: &IdentifierSet,
    marked: &HashSet<String>,
    restricted: &HashMap<String, HashSet<String>>,
) -> Vec<ProtoFile> {
    let mut files = Vec::new();
    for file in &schema.files {
        let types: Vec<Type> = file
            .types
            .iter()
            .filter(|ty| marked.contains(ty.name()))
            .map(|ty| match ty {
                Type::Message(message) => {
                    let mut message = message.clone();
                    message.fields.retain(|field| {
                        let member = format!("{}.{}", message.name, field.name);
                        if let Some(allowed) = restricted.get(&message.name) {
                            if !allowed.contains(&member) {
                                return false;
                            }
                        }
                        set.matching_exclude(&member).is_none()
                    });
                    message
                        .oneofs
                        .retain(|group| message.fields.iter().any(|f| f.oneof.as_deref() == Some(group)));
                    Type::Message(message)
                }
                Type::Enum(enum_type) => Type::Enum(enum_type.clone()),
            })
            .collect();

        let services = file
            .services
            .iter()
            .filter(|service| marked.contains(&service.name))
            .map(|service| {
                let mut service = service.clone();
                service.rpcs.retain(|rpc| {
                    let member = format!("{}.{}", service.name, rpc.name);
                    if let Some(allowed) = restricted.get(&service.name) {
                        if !allowed.contains(&member) {
                            return false;
                        }
                    }
                    set.matching_exclude(&member).is_none()
                });
                service
            })
            .collect::<Vec<_>>();

        if types.is_empty() && services.is_empty() {
            continue;
        }
        files.push(ProtoFile {
            path: file.path.clone(),
            package: file.package.clone(),
            types,
            services,
        });
    }
    files
}

fn unused_rules(rules: &[crate::ident::Rule], used: &[bool]) -> Vec<String> {
    rules
        .iter()
        .zip(used)
        .filter(|(_, used)| !**used)
        .map(|(rule, _)| rule.text().to_owned())
        .collect()
}
