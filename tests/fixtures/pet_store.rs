// A small controller-style pet store used by the integration tests.

pub struct Pet {
    pub id: u64,
    pub name: String,
    pub status: Status,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

pub struct Category {
    pub id: u64,
    pub name: String,
}

pub struct Tag {
    pub name: String,
}

pub enum Status {
    Available,
    Pending,
    Sold,
}

pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[scope("/api/categories")]
pub trait Lookup<T> {
    #[get("/{id}")]
    fn find(&self, #[path("id")] id: u64) -> T;
}

pub struct CategoryController;

impl Lookup<Category> for CategoryController {
    fn find(&self, id: u64) -> Category {
        Category { id, name: String::new() }
    }
}

pub struct PetController;

#[scope("/api/pets")]
#[api(description = "Pet operations", tags("pets"))]
impl PetController {
    #[get]
    pub fn list(&self, #[query(name = "page", required = false)] page: Option<u32>) -> Page<Pet> {
        Page { items: Vec::new(), total: 0 }
    }

    #[post]
    pub fn create(&self, #[body] pet: Pet) -> Pet {
        pet
    }

    #[put("/{id}")]
    pub fn update(&self, #[path("id")] id: u64, pet: Pet) -> Pet {
        pet
    }

    #[delete("/{id}")]
    #[hidden]
    pub fn remove(&self, #[path("id")] id: u64) {}

    #[get("/internal/stats")]
    pub fn stats(&self, #[header("X-Request-Id")] request_id: String) -> usize {
        0
    }
}
