use super::*;

impl<S: TaskStore> Dashboard<S> {
    /// Create a section at the end of the list. Waits for the stored
    /// row so the caller can immediately file a task under the new id.
    /// Colors cycle through the palette by position.
    pub async fn add_section(&mut self, name: &str) -> Result<Option<Uuid>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let next_order = self
            .sections
            .iter()
            .map(|section| section.sort_order)
            .max()
            .map_or(0, |max| max + 1);
        let color = SECTION_COLOR_PALETTE[self.sections.len() % SECTION_COLOR_PALETTE.len()];
        let new_section = NewSection {
            user_id: self.user.id,
            name: name.to_string(),
            color: color.to_string(),
            sort_order: next_order,
        };

        match self.store.insert_section(&new_section).await {
            Ok(row) => {
                let id = row.id;
                self.sections.push(row);
                Ok(Some(id))
            }
            Err(err) => {
                self.banner = Some(format!("Failed to add section: {}", err.message));
                Err(err)
            }
        }
    }

    pub async fn rename_section(&mut self, id: Uuid, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let Some(section) = self.sections.iter_mut().find(|section| section.id == id) else {
            return;
        };
        section.name = name.to_string();

        let patch = SectionPatch {
            name: Some(name.to_string()),
            ..SectionPatch::default()
        };
        if let Err(err) = self.store.update_section(self.user.id, id, &patch).await {
            self.record_write_failure("update_section", "rename the section", err);
        }
    }

    pub async fn recolor_section(&mut self, id: Uuid, color: &str) {
        let Some(section) = self.sections.iter_mut().find(|section| section.id == id) else {
            return;
        };
        section.color = color.to_string();

        let patch = SectionPatch {
            color: Some(color.to_string()),
            ..SectionPatch::default()
        };
        if let Err(err) = self.store.update_section(self.user.id, id, &patch).await {
            self.record_write_failure("update_section", "recolor the section", err);
        }
    }

    /// Remove a section. Its tasks survive and fall back to the
    /// uncategorized group, matching the store's set-null delete rule.
    pub async fn delete_section(&mut self, id: Uuid) {
        let Some(pos) = self.sections.iter().position(|section| section.id == id) else {
            return;
        };
        self.sections.remove(pos);
        for task in self.tasks.iter_mut() {
            if task.section_id == Some(id) {
                task.section_id = None;
            }
        }

        if let Err(err) = self.store.delete_section(self.user.id, id).await {
            self.record_write_failure("delete_section", "delete the section", err);
        }
    }

    pub async fn reorder_sections(&mut self, from: usize, to: usize) {
        if from == to || from >= self.sections.len() || to >= self.sections.len() {
            return;
        }

        let section = self.sections.remove(from);
        self.sections.insert(to, section);
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.sort_order = index as i64;
        }

        let orders: Vec<(Uuid, i64)> = self
            .sections
            .iter()
            .map(|section| (section.id, section.sort_order))
            .collect();
        if let Err(err) = self.store.update_section_order(self.user.id, &orders).await {
            self.record_write_failure("update_section_order", "save the section order", err);
        }
    }
}
