//! Single hover slot shared by every interactive layer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Zone,
    Link,
    ThermalAnomaly,
    Aircraft,
    Vessel,
}

/// What the pointer is over. Live overlay entities are addressed by their
/// index in the current payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverSelection {
    #[default]
    None,
    Hovered(EntityRef),
}

impl HoverSelection {
    /// Entering an entity replaces whatever was hovered before.
    pub fn hover(&mut self, entity: EntityRef) {
        *self = HoverSelection::Hovered(entity);
    }

    /// Leaving only clears the slot if `entity` still owns it, so a late
    /// leave from the previous entity cannot hide the new tooltip.
    pub fn leave(&mut self, entity: &EntityRef) {
        if self.is_hovered(entity) {
            *self = HoverSelection::None;
        }
    }

    pub fn clear(&mut self) {
        *self = HoverSelection::None;
    }

    pub fn is_hovered(&self, entity: &EntityRef) -> bool {
        matches!(self, HoverSelection::Hovered(current) if current == entity)
    }

    pub fn is(&self, kind: EntityKind, id: &str) -> bool {
        matches!(self, HoverSelection::Hovered(current) if current.kind == kind && current.id == id)
    }

    pub fn current(&self) -> Option<&EntityRef> {
        match self {
            HoverSelection::None => None,
            HoverSelection::Hovered(entity) => Some(entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hovering_b_after_a_leaves_only_b() {
        let a = EntityRef::new(EntityKind::Zone, "ukraine");
        let b = EntityRef::new(EntityKind::Aircraft, "3");
        let mut hover = HoverSelection::default();

        hover.hover(a.clone());
        hover.hover(b.clone());
        hover.leave(&a);

        assert!(hover.is_hovered(&b));
        assert!(!hover.is_hovered(&a));
        assert_eq!(hover.current(), Some(&b));
    }

    #[test]
    fn leave_clears_own_hover() {
        let link = EntityRef::new(EntityKind::Link, "link-4");
        let mut hover = HoverSelection::default();
        hover.hover(link.clone());
        hover.leave(&link);
        assert_eq!(hover, HoverSelection::None);
    }
}
