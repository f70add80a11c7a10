use async_trait::async_trait;
use elements_core::models::{CategoryDeclaration, ElementDeclaration};
use elements_core::traits::RegistrySource;
use elements_core::ElementsResult;

/// Declarations held in memory, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticRegistrySource {
    categories: Vec<CategoryDeclaration>,
}

impl StaticRegistrySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(
        mut self,
        category: impl Into<String>,
        elements: Vec<ElementDeclaration>,
    ) -> Self {
        self.categories.push(CategoryDeclaration {
            category: category.into(),
            elements,
        });
        self
    }
}

#[async_trait]
impl RegistrySource for StaticRegistrySource {
    async fn load_categories(&self) -> ElementsResult<Vec<CategoryDeclaration>> {
        Ok(self.categories.clone())
    }

    fn describe(&self) -> String {
        format!("static:{} categories", self.categories.len())
    }
}
