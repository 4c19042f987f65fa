//! Body description rendering
//!
//! Links are named by their depth-first child path (`part-0-1-0`) and each
//! joint is named `<child>_to_<parent>`, so a loader can match joints to
//! motors by walking the tree in the same order as [`Creature::motors`].

use std::fmt::Write;

use crate::creature::{Creature, VisitedPart};
use crate::phenotype::{JointType, LinkShape, Phenotype};

/// Turns a developed creature into a text document a simulator can load
pub trait BodyRenderer {
    /// File extension of the produced document, without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, creature: &Creature) -> String;
}

/// Renders URDF (Unified Robot Description Format) XML
#[derive(Debug, Clone, Copy)]
pub struct UrdfRenderer {
    /// Torque or force bound written into every joint limit
    pub effort: f64,
    /// Velocity bound written into every joint limit
    pub velocity: f64,
    /// Travel bound: radians for revolute joints, metres for prismatic ones
    pub travel: f64,
}

impl Default for UrdfRenderer {
    fn default() -> Self {
        Self {
            effort: 1.0,
            velocity: 1.0,
            travel: std::f64::consts::PI,
        }
    }
}

impl BodyRenderer for UrdfRenderer {
    fn extension(&self) -> &'static str {
        "urdf"
    }

    fn render(&self, creature: &Creature) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_robot(&mut out, creature);
        out
    }
}

impl UrdfRenderer {
    fn write_robot(&self, out: &mut String, creature: &Creature) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0"?>"#)?;
        writeln!(out, r#"<robot name="{}">"#, escape(creature.name()))?;

        for visited in creature.body().depth_first() {
            self.write_link(out, &visited)?;
        }
        for visited in creature.body().depth_first() {
            if let Some(parent_path) = visited.parent_path {
                self.write_joint(out, &visited, &parent_path.to_string())?;
            }
        }

        writeln!(out, "</robot>")
    }

    fn write_link(&self, out: &mut String, visited: &VisitedPart<'_>) -> std::fmt::Result {
        let phenotype = visited.part.phenotype();
        let geometry = geometry(phenotype);
        let [ixx, iyy, izz] = inertia(phenotype);

        writeln!(out, r#"  <link name="{}">"#, visited.path)?;
        writeln!(out, "    <visual>")?;
        writeln!(out, "      <geometry>{}</geometry>", geometry)?;
        writeln!(out, "    </visual>")?;
        writeln!(out, "    <collision>")?;
        writeln!(out, "      <geometry>{}</geometry>", geometry)?;
        writeln!(out, "    </collision>")?;
        writeln!(out, "    <inertial>")?;
        writeln!(out, r#"      <mass value="{}"/>"#, phenotype.link_mass)?;
        writeln!(
            out,
            r#"      <inertia ixx="{}" iyy="{}" izz="{}" ixy="0" ixz="0" iyz="0"/>"#,
            ixx, iyy, izz
        )?;
        writeln!(out, "    </inertial>")?;
        writeln!(out, "  </link>")
    }

    fn write_joint(
        &self,
        out: &mut String,
        visited: &VisitedPart<'_>,
        parent: &str,
    ) -> std::fmt::Result {
        let phenotype = visited.part.phenotype();
        let axis = phenotype.joint_axis.unit();
        let rpy = phenotype.joint_origin_rpy;
        let xyz = phenotype.joint_origin_xyz;

        writeln!(
            out,
            r#"  <joint name="{}_to_{}" type="{}">"#,
            visited.path, parent, phenotype.joint_type
        )?;
        writeln!(out, r#"    <parent link="{}"/>"#, parent)?;
        writeln!(out, r#"    <child link="{}"/>"#, visited.path)?;
        writeln!(out, r#"    <axis xyz="{} {} {}"/>"#, axis.x, axis.y, axis.z)?;
        if phenotype.joint_type != JointType::Fixed {
            writeln!(
                out,
                r#"    <limit effort="{}" lower="{}" upper="{}" velocity="{}"/>"#,
                self.effort, -self.travel, self.travel, self.velocity
            )?;
        }
        writeln!(
            out,
            r#"    <origin rpy="{} {} {}" xyz="{} {} {}"/>"#,
            rpy.x, rpy.y, rpy.z, xyz.x, xyz.y, xyz.z
        )?;
        writeln!(out, "  </joint>")
    }
}

fn geometry(phenotype: &Phenotype) -> String {
    match phenotype.link_shape {
        LinkShape::Cylinder => format!(
            r#"<cylinder length="{}" radius="{}"/>"#,
            phenotype.link_length, phenotype.link_radius
        ),
        LinkShape::Sphere => format!(r#"<sphere radius="{}"/>"#, phenotype.link_radius),
    }
}

/// Principal moments of a solid cylinder (axis along z) or sphere
fn inertia(phenotype: &Phenotype) -> [f64; 3] {
    let m = phenotype.link_mass;
    let r = phenotype.link_radius;
    match phenotype.link_shape {
        LinkShape::Cylinder => {
            let h = phenotype.link_length;
            let side = m * (3.0 * r * r + h * h) / 12.0;
            [side, side, m * r * r / 2.0]
        }
        LinkShape::Sphere => {
            let i = 2.0 / 5.0 * m * r * r;
            [i, i, i]
        }
    }
}

/// Escape text for use inside a double-quoted XML attribute
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
