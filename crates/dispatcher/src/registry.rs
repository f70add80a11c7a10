//! 元素注册表
//!
//! 注册表在加载时把注册源中的声明解析为 [`ElementDefinition`]，
//! 之后只提供按标识的只读查找。每条声明独立解析实现，
//! 所有失败会被汇总到一个 [`ElementsError::RegistryLoad`] 中返回。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use elements_core::identifier::normalize_element_id;
use elements_core::models::{CachePolicy, ElementDefinition};
use elements_core::traits::{ElementFactory, RegistrySource};
use elements_core::{ElementsError, ElementsResult};
use tracing::{debug, info, instrument};

/// 实现目录：`分类/文件` -> 元素工厂
#[derive(Clone, Default)]
pub struct ImplementationCatalog {
    factories: HashMap<String, Arc<dyn ElementFactory>>,
}

impl ImplementationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(category: &str, file: &str) -> String {
        format!("{category}/{file}")
    }

    pub fn register<F>(&mut self, category: &str, file: &str, factory: F) -> &mut Self
    where
        F: ElementFactory + 'static,
    {
        self.factories
            .insert(Self::key(category, file), Arc::new(factory));
        self
    }

    pub fn register_shared(
        &mut self,
        category: &str,
        file: &str,
        factory: Arc<dyn ElementFactory>,
    ) -> &mut Self {
        self.factories.insert(Self::key(category, file), factory);
        self
    }

    pub fn with<F>(mut self, category: &str, file: &str, factory: F) -> Self
    where
        F: ElementFactory + 'static,
    {
        self.register(category, file, factory);
        self
    }

    pub fn resolve(&self, category: &str, file: &str) -> ElementsResult<Arc<dyn ElementFactory>> {
        let reference = Self::key(category, file);
        self.factories
            .get(&reference)
            .cloned()
            .ok_or(ElementsError::ImplementationNotFound { reference })
    }

    pub fn contains(&self, category: &str, file: &str) -> bool {
        self.factories.contains_key(&Self::key(category, file))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// 加载时应用的默认值
#[derive(Debug, Clone, Default)]
pub struct RegistryDefaults {
    /// 缓存可用时，未声明缓存设置的元素继承此策略
    pub default_cache_policy: Option<CachePolicy>,
}

/// 元素注册表
#[derive(Debug, Default)]
pub struct ElementRegistry {
    definitions: HashMap<String, Arc<ElementDefinition>>,
    known_missing: Mutex<HashSet<String>>,
}

impl ElementRegistry {
    /// 从注册源加载全部声明
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn load(
        source: &dyn RegistrySource,
        catalog: &ImplementationCatalog,
        defaults: &RegistryDefaults,
    ) -> ElementsResult<Self> {
        debug!("加载元素声明...");
        let categories = source.load_categories().await?;

        let mut definitions = Vec::new();
        let mut failures = Vec::new();
        for category in &categories {
            for declaration in &category.elements {
                match catalog.resolve(&category.category, &declaration.file) {
                    Ok(factory) => definitions.push(ElementDefinition::from_declaration(
                        &category.category,
                        declaration,
                        factory,
                        defaults.default_cache_policy.as_ref(),
                    )),
                    Err(e) => failures.push(format!(
                        "{}.{}: {}",
                        category.category, declaration.name, e
                    )),
                }
            }
        }

        if !failures.is_empty() {
            return Err(ElementsError::RegistryLoad { failures });
        }

        let registry = Self::from_definitions(definitions);
        info!("已加载 {} 个元素定义", registry.len());
        Ok(registry)
    }

    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = ElementDefinition>,
    {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.identifier.clone(), Arc::new(definition)))
            .collect();
        Self {
            definitions,
            known_missing: Mutex::new(HashSet::new()),
        }
    }

    /// 按标识查找定义，查找前先规范化标识
    pub fn get_by_id(&self, id: &str) -> Option<Arc<ElementDefinition>> {
        if id.is_empty() {
            return None;
        }
        self.definitions.get(&normalize_element_id(id)).cloned()
    }

    /// 记录一个缺失的标识，仅在首次记录时返回 `true`
    pub fn note_missing(&self, id: &str) -> bool {
        self.known_missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string())
    }

    /// 排序后的全部标识
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ElementDefinition>> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
