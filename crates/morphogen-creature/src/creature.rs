//! Creature development
//!
//! A creature is grown from DNA by expressing its genes and attaching each
//! decoded part to an earlier one. Parts live in an arena indexed by their
//! expressed-gene index, so part `0` is always the root.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::dna::Dna;
use crate::motor::Motor;
use crate::movement::{CreatureMovement, LethalityLimits};
use crate::phenotype::Phenotype;
use crate::types::CreatureId;

/// Index of a part inside its body arena
pub type PartId = usize;

/// One node of the body tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreaturePart {
    id: PartId,
    phenotype: Phenotype,
    parent: Option<PartId>,
    children: Vec<PartId>,
}

impl CreaturePart {
    pub fn id(&self) -> PartId {
        self.id
    }

    pub fn phenotype(&self) -> &Phenotype {
        &self.phenotype
    }

    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    /// Child ids in ascending order
    pub fn children(&self) -> &[PartId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Path of child positions from the root, e.g. `[0, 1, 0]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartPath(Vec<usize>);

impl PartPath {
    fn root() -> Self {
        PartPath(vec![0])
    }

    fn child(&self, position: usize) -> Self {
        let mut path = self.0.clone();
        path.push(position);
        PartPath(path)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Number of joints between this part and the root
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("part")?;
        for segment in &self.0 {
            write!(f, "-{}", segment)?;
        }
        Ok(())
    }
}

/// A part visited during a depth-first walk
#[derive(Debug, Clone, Copy)]
pub struct VisitedPart<'a> {
    pub part: &'a CreaturePart,
    pub path: &'a PartPath,
    pub parent_path: Option<&'a PartPath>,
}

/// Arena holding the rooted part tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureBody {
    parts: Vec<CreaturePart>,
    paths: Vec<PartPath>,
    order: Vec<PartId>,
}

impl CreatureBody {
    /// Assemble the tree. Returns `None` when there are no phenotypes or a
    /// part does not reference an earlier part as its parent.
    pub fn assemble(phenotypes: &[Phenotype]) -> Option<Self> {
        let mut parts: Vec<CreaturePart> = Vec::with_capacity(phenotypes.len());

        for (id, phenotype) in phenotypes.iter().enumerate() {
            let parent = match (id, phenotype.joint_parent) {
                (0, _) => None,
                (_, Some(parent)) if parent < id => Some(parent),
                (_, other) => {
                    log::warn!("Part {} has invalid joint parent {:?}", id, other);
                    return None;
                }
            };
            if let Some(parent) = parent {
                parts[parent].children.push(id);
            }
            parts.push(CreaturePart {
                id,
                phenotype: *phenotype,
                parent,
                children: Vec::new(),
            });
        }

        if parts.is_empty() {
            return None;
        }

        let (order, paths) = Self::walk(&parts);
        Some(Self {
            parts,
            paths,
            order,
        })
    }

    /// Pre-order walk with an explicit stack; returns visit order and the
    /// path of every part indexed by part id
    fn walk(parts: &[CreaturePart]) -> (Vec<PartId>, Vec<PartPath>) {
        let mut order = Vec::with_capacity(parts.len());
        let mut paths = vec![PartPath::root(); parts.len()];
        let mut stack = vec![0];

        while let Some(id) = stack.pop() {
            order.push(id);
            let children = &parts[id].children;
            for (position, &child) in children.iter().enumerate() {
                paths[child] = paths[id].child(position);
            }
            stack.extend(children.iter().rev());
        }

        (order, paths)
    }

    pub fn root(&self) -> &CreaturePart {
        &self.parts[0]
    }

    pub fn part(&self, id: PartId) -> Option<&CreaturePart> {
        self.parts.get(id)
    }

    pub fn children(&self, id: PartId) -> impl Iterator<Item = &CreaturePart> + '_ {
        self.parts
            .get(id)
            .into_iter()
            .flat_map(|part| part.children.iter().map(|&child| &self.parts[child]))
    }

    pub fn path(&self, id: PartId) -> Option<&PartPath> {
        self.paths.get(id)
    }

    /// Parts in expressed order
    pub fn parts(&self) -> &[CreaturePart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts in depth-first pre-order, children visited in ascending order
    pub fn depth_first(&self) -> impl Iterator<Item = VisitedPart<'_>> + '_ {
        self.order.iter().map(move |&id| {
            let part = &self.parts[id];
            VisitedPart {
                part,
                path: &self.paths[id],
                parent_path: part.parent.map(|parent| &self.paths[parent]),
            }
        })
    }

    /// Longest root-to-leaf chain of joints
    pub fn depth(&self) -> usize {
        self.paths.iter().map(PartPath::depth).max().unwrap_or(0)
    }
}

/// A developed individual
#[derive(Debug)]
pub struct Creature {
    id: CreatureId,
    name: String,
    dna: Dna,
    phenotypes: Vec<Phenotype>,
    body: CreatureBody,
    pub movement: CreatureMovement,
}

impl Creature {
    /// Grow a creature, or `None` when no gene passes the threshold
    pub fn develop_from(dna: Dna, expression_threshold: f64) -> Option<Self> {
        let id = CreatureId::next();
        Self::develop(id, format!("creature-{}", id.value()), dna, expression_threshold)
    }

    pub fn develop_named(
        name: impl Into<String>,
        dna: Dna,
        expression_threshold: f64,
    ) -> Option<Self> {
        Self::develop(CreatureId::next(), name.into(), dna, expression_threshold)
    }

    fn develop(id: CreatureId, name: String, dna: Dna, expression_threshold: f64) -> Option<Self> {
        let phenotypes = dna.express(expression_threshold);
        let body = CreatureBody::assemble(&phenotypes)?;
        log::trace!(
            "Developed {} with {} of {} genes expressed",
            name,
            phenotypes.len(),
            dna.gene_count()
        );
        Some(Self {
            id,
            name,
            dna,
            phenotypes,
            body,
            movement: CreatureMovement::default(),
        })
    }

    /// Replace the movement tracker with a fresh one using `limits`
    pub fn with_lethality(mut self, limits: LethalityLimits) -> Self {
        self.movement = CreatureMovement::new(limits);
        self
    }

    pub fn id(&self) -> CreatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dna(&self) -> &Dna {
        &self.dna
    }

    pub fn phenotypes(&self) -> &[Phenotype] {
        &self.phenotypes
    }

    pub fn body(&self) -> &CreatureBody {
        &self.body
    }

    /// Structural comparison; `==` compares identity
    pub fn same_dna(&self, other: &Creature) -> bool {
        self.dna == other.dna
    }

    pub fn expressed_gene_count(&self) -> usize {
        self.phenotypes.len()
    }

    pub fn suppressed_gene_count(&self) -> usize {
        self.dna.gene_count() - self.phenotypes.len()
    }

    /// Distance travelled so far
    pub fn fitness(&self) -> f64 {
        self.movement.distance()
    }

    pub fn is_lethal(&self) -> bool {
        self.movement.lethal_move()
    }

    /// One motor per joint, in depth-first joint order
    pub fn motors(&self) -> Vec<Motor> {
        self.body
            .depth_first()
            .filter(|visited| !visited.part.is_root())
            .map(|visited| Motor::from_phenotype(visited.part.phenotype()))
            .collect()
    }
}

impl PartialEq for Creature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Creature {}

impl Hash for Creature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::GENE_LENGTH;
    use crate::soup::PrimordialSoup;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    /// Expressed gene whose joint-parent selector is `parent`
    fn gene(parent: f64) -> Vec<f64> {
        let mut bases = vec![0.4; GENE_LENGTH];
        bases[5] = parent;
        bases[GENE_LENGTH - 1] = 1.0;
        bases
    }

    fn dna_of(genes: &[Vec<f64>]) -> Dna {
        Dna::parse(genes.concat()).unwrap()
    }

    #[test]
    fn test_single_all_ones_gene_is_root_only() {
        let dna = Dna::parse(vec![1.0; GENE_LENGTH]).unwrap();
        let creature = Creature::develop_from(dna, 0.5).unwrap();

        assert_eq!(creature.phenotypes().len(), 1);
        assert_eq!(creature.phenotypes()[0].joint_parent, None);
        assert_eq!(creature.body().len(), 1);
        assert!(creature.body().root().children().is_empty());
        assert!(creature.motors().is_empty());
    }

    #[test]
    fn test_unexpressed_dna_is_not_viable() {
        let dna = Dna::parse(vec![0.0; GENE_LENGTH * 3]).unwrap();
        assert!(Creature::develop_from(dna, 0.5).is_none());

        let too_short = Dna::parse(vec![1.0; 4]).unwrap();
        assert!(Creature::develop_from(too_short, 0.5).is_none());
    }

    #[test]
    fn test_tree_shape_and_paths() {
        // 0 <- 1, 0 <- 2, 2 <- 3
        let dna = dna_of(&[gene(0.0), gene(0.0), gene(0.0), gene(0.9)]);
        let creature = Creature::develop_from(dna, 0.5).unwrap();
        let body = creature.body();

        assert_eq!(body.root().children(), &[1, 2]);
        assert_eq!(body.part(3).unwrap().parent(), Some(2));
        assert_eq!(body.path(3).unwrap().to_string(), "part-0-1-0");
        assert_eq!(body.path(0).unwrap().to_string(), "part-0");
        assert_eq!(body.depth(), 2);

        let order: Vec<PartId> = body.depth_first().map(|v| v.part.id()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);

        let names: Vec<String> = body.depth_first().map(|v| v.path.to_string()).collect();
        assert_eq!(names, vec!["part-0", "part-0-0", "part-0-1", "part-0-1-0"]);
        assert_eq!(creature.motors().len(), 3);
    }

    #[test]
    fn test_depth_first_descends_before_siblings() {
        // 0 <- 1, 1 <- 2, 0 <- 3
        let dna = dna_of(&[gene(0.0), gene(0.0), gene(0.6), gene(0.0)]);
        let creature = Creature::develop_from(dna, 0.5).unwrap();

        let order: Vec<PartId> = creature.body().depth_first().map(|v| v.part.id()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        let child_count: Vec<usize> = creature
            .body()
            .children(0)
            .map(|part| part.id())
            .collect();
        assert_eq!(child_count, vec![1, 3]);
    }

    #[test]
    fn test_joint_parents_precede_children() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(2024);
        let mut developed = 0;
        for _ in 0..200 {
            let code = PrimordialSoup::spark_life(&mut rng, 12);
            let dna = Dna::parse(code).unwrap();
            let Some(creature) = Creature::develop_from(dna, 0.5) else {
                continue;
            };
            developed += 1;
            for (index, phenotype) in creature.phenotypes().iter().enumerate().skip(1) {
                let parent = phenotype.joint_parent.unwrap();
                assert!(parent < index);
            }
            assert_eq!(creature.body().depth_first().count(), creature.body().len());
        }
        assert!(developed > 150);
    }

    #[test]
    fn test_identity_equality() {
        let dna = dna_of(&[gene(0.0), gene(0.5)]);
        let a = Creature::develop_from(dna.clone(), 0.5).unwrap();
        let b = Creature::develop_from(dna, 0.5).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, a);
        assert!(a.same_dna(&b));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_development_is_deterministic() {
        let dna = dna_of(&[gene(0.0), gene(0.3), gene(0.7), gene(0.95)]);
        let a = Creature::develop_named("a", dna.clone(), 0.5).unwrap();
        let b = Creature::develop_named("b", dna, 0.5).unwrap();
        assert_eq!(a.body(), b.body());
        assert_eq!(a.phenotypes(), b.phenotypes());
    }

    #[test]
    fn test_gene_counts() {
        let mut silent = gene(0.0);
        silent[GENE_LENGTH - 1] = 0.1;
        let dna = dna_of(&[gene(0.0), silent, gene(0.0)]);
        let creature = Creature::develop_from(dna, 0.5).unwrap();

        assert_eq!(creature.expressed_gene_count(), 2);
        assert_eq!(creature.suppressed_gene_count(), 1);
    }

    #[test]
    fn test_assemble_rejects_forward_parent() {
        let dna = dna_of(&[gene(0.0), gene(0.0)]);
        let mut phenotypes = dna.express(0.5);
        phenotypes[1].joint_parent = Some(1);
        assert!(CreatureBody::assemble(&phenotypes).is_none());
        assert!(CreatureBody::assemble(&[]).is_none());
    }
}
